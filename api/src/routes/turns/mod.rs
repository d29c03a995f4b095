pub mod turn_request;
pub mod turn_response;
pub mod turn_route;
