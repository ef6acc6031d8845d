mod config_cmd;
mod doctor_cmd;

pub use config_cmd::handle_config;
pub use doctor_cmd::run_doctor;
