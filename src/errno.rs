// hook 操作错误码，0 表示成功，数值对 FFI 接入方保持稳定
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Errno {
    Ok = 0,       // 成功
    Invalid = 1,  // 参数无效
    ElfInit = 2,  // 描述符未初始化或已被 reset
    Format = 3,   // ELF 格式错误
    NotFound = 4, // 符号未找到，或地址不在任何 PT_LOAD 段内
    Unknown = 5,  // mprotect 调用失败
}

impl Errno {
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<Errno> for i32 {
    fn from(value: Errno) -> Self {
        value as i32
    }
}
