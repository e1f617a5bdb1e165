#![allow(dead_code)]
#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]

#[cfg(not(any(target_arch = "arm", target_arch = "aarch64", target_arch = "x86_64")))]
compile_error!("srx_got supports little-endian arm, aarch64 and x86_64 targets only");

// ELF 解析核心，处理动态段、符号表、重定位表与 GOT 改写
mod elf;
// 错误码定义
mod errno;
// 日志输出，经 log facade 转发
mod log;
// 页面保护与指令缓存
mod memory;
// 版本信息
mod version;

pub use elf::{Elf, check_elf_header};
pub use errno::Errno;
pub use version::{version, version_str, version_str_full};
