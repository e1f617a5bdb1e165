// 内存页面保护属性修改与指令缓存刷新，保护位沿用 ELF 段的 PF_* 约定

use crate::errno::Errno;
use crate::log;
use once_cell::sync::Lazy;

pub const PF_X: u32 = 0x1;
pub const PF_W: u32 = 0x2;
pub const PF_R: u32 = 0x4;

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as usize } else { 4096 }
});

// 地址所在页面的起始地址
pub fn page_start(addr: usize) -> usize {
    addr & !(*PAGE_SIZE - 1)
}

// 地址所在页面的结束地址（即下一页的起始地址）
pub fn page_end(addr: usize) -> usize {
    page_start(addr) + *PAGE_SIZE
}

// ELF 段保护位转 mprotect 保护位
fn pf_to_prot(prots: u32) -> i32 {
    let mut prot = 0;
    if prots & PF_R != 0 {
        prot |= libc::PROT_READ;
    }
    if prots & PF_W != 0 {
        prot |= libc::PROT_WRITE;
    }
    if prots & PF_X != 0 {
        prot |= libc::PROT_EXEC;
    }
    prot
}

// 按页粒度修改地址所在页面的保护属性
pub fn set_addr_protect(addr: usize, prots: u32) -> Result<(), Errno> {
    let start = page_start(addr);
    let result =
        unsafe { libc::mprotect(start as *mut libc::c_void, *PAGE_SIZE, pf_to_prot(prots)) };
    if result != 0 {
        let err = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        log::error(format_args!("mprotect failed: {err}"));
        return Err(Errno::Unknown);
    }
    Ok(())
}

// 刷新地址所在页面的指令缓存，仅 32 位 ARM 需要显式的 cacheflush 系统调用
#[cfg(target_arch = "arm")]
pub fn flush_instruction_cache(addr: usize) {
    const ARM_NR_CACHEFLUSH: libc::c_long = 0x0f0002;
    unsafe {
        libc::syscall(ARM_NR_CACHEFLUSH, page_start(addr), page_end(addr), 0);
    }
}

// 64 位目标上内核在建立可执行映射时已完成缓存维护，数据写入后无需再刷新
#[cfg(not(target_arch = "arm"))]
pub fn flush_instruction_cache(addr: usize) {
    let _ = addr;
}

#[cfg(test)]
mod tests;
