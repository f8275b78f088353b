pub mod iq_interpolation;
pub mod logger;
