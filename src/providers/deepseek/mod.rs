pub mod deepseek;
