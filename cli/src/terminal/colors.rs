use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 138, g: 180, b: 248 };
pub const ACCENT: Color = Color::TrueColor { r: 129, g: 201, b: 149 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 210, g: 210, b: 210 };
pub const WARNING: Color = Color::Yellow;
