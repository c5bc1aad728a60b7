pub mod event_request;
pub mod event_response;
pub mod event_route;
