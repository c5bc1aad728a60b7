pub mod events;
pub mod health_route;
