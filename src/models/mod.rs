pub mod push_token;
pub mod trip;
