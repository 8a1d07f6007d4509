pub mod pandapower;
pub mod projector;
pub mod request;
