mod handlers;
mod middleware;
mod routes;
#[cfg(test)]
mod tests;
mod types;

pub use routes::create_router;
pub use types::ApiError;
