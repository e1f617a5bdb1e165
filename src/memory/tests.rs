// 页面计算与保护修改的单元测试

use super::{PF_R, PF_W, page_end, page_start, set_addr_protect};
use std::ptr::null_mut;

#[test]
fn page_bounds_enclose_address() {
    let addr = 0x1234_5678usize;
    let start = page_start(addr);
    let end = page_end(addr);
    assert!(start <= addr);
    assert!(addr < end);
    let page_size = end - start;
    assert!(page_size.is_power_of_two());
    assert_eq!(start % page_size, 0);
}

#[test]
fn set_addr_protect_applies_to_owned_page() {
    unsafe {
        let size = page_end(0);
        let addr = libc::mmap(
            null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        );
        assert_ne!(addr, libc::MAP_FAILED);
        let base = addr as usize;

        set_addr_protect(base, PF_R).unwrap();
        set_addr_protect(base, PF_R | PF_W).unwrap();
        std::ptr::write(base as *mut u8, 42);
        assert_eq!(std::ptr::read(base as *const u8), 42);

        libc::munmap(addr, size);
    }
}
