pub mod normalize_ocr;
pub mod requirements;
pub mod verify;
