// 日志输出，经 log facade 转发，由宿主应用安装具体 sink

use std::fmt;

pub(crate) fn info(args: fmt::Arguments) {
    ::log::info!("{args}");
}

pub(crate) fn debug(args: fmt::Arguments) {
    ::log::debug!("{args}");
}

pub(crate) fn warn(args: fmt::Arguments) {
    ::log::warn!("{args}");
}

pub(crate) fn error(args: fmt::Arguments) {
    ::log::error!("{args}");
}
