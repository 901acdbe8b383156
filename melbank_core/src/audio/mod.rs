pub mod decoder;
pub mod fbank;
