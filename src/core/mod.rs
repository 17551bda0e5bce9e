pub mod composer;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod params;
pub mod renderer;
pub mod sniff;
pub mod store;
pub mod template;
