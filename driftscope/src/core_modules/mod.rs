pub mod drift;
pub mod frame;
pub mod noise;
pub mod operator;
