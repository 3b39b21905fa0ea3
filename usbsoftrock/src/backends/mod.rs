pub mod requests;
pub mod usb;
