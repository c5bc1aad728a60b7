//! Path filters applied while walking a repository tree.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Extensions whose content is never embedded: images, media, fonts,
    /// archives, compiled artifacts and binary lockfiles.
    static ref BINARY_PATH: Regex = Regex::new(
        r"(?i)\.(png|jpe?g|gif|bmp|ico|webp|svg|tiff?|psd|mp3|mp4|m4a|wav|ogg|flac|avi|mov|mkv|webm|woff2?|ttf|otf|eot|zip|tar|gz|tgz|bz2|xz|7z|rar|jar|war|exe|dll|so|dylib|a|o|obj|class|pyc|wasm|bin|pdf|lockb|db|sqlite)$"
    )
    .expect("binary path regex is valid");
}

/// True if the file name looks like a binary artifact.
pub fn is_binary_path(path: &str) -> bool {
    BINARY_PATH.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_binary_extensions() {
        for p in ["logo.PNG", "assets/font.woff2", "dist/app.tar.gz", "bun.lockb", "lib.so"] {
            assert!(is_binary_path(p), "{p}");
        }
    }

    #[test]
    fn keeps_text_files() {
        for p in ["src/main.rs", "README.md", "Cargo.lock", "web/app.tsx", "pngquant.c", "data.json"] {
            assert!(!is_binary_path(p), "{p}");
        }
    }
}
