pub mod invitation;
pub mod layout;
pub mod notification;

// Re-export commonly used functions from layout
pub use layout::email_page;
