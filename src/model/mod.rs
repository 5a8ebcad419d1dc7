pub mod attendance;
pub mod layout;
pub mod role;
pub mod staff;
pub mod table;
