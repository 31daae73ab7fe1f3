pub mod etl_use_case;
pub mod ports;
