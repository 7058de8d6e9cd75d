pub mod brief;
pub mod config_cmd;
pub mod daily;
pub mod doctor;
pub mod prepare_event;
pub mod weekly;
