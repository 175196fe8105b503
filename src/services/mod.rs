pub mod notify;
pub mod object;
pub mod record;
pub mod trip;
