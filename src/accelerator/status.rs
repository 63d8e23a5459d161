//! Kernel status codes.
//!
//! Every kernel returns an `i32`; 0 is success. The numeric values are
//! fixed by the native library ABI.

/// Status returned by an accelerator kernel call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelStatus {
    Success,
    InvalidArgument,
    DeviceAlloc,
    DeviceCopy,
    KernelLaunch,
    DeviceUnavailable,
    Internal,
    Unknown(i32),
}

impl KernelStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => KernelStatus::Success,
            1 => KernelStatus::InvalidArgument,
            2 => KernelStatus::DeviceAlloc,
            3 => KernelStatus::DeviceCopy,
            4 => KernelStatus::KernelLaunch,
            5 => KernelStatus::DeviceUnavailable,
            99 => KernelStatus::Internal,
            other => KernelStatus::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            KernelStatus::Success => 0,
            KernelStatus::InvalidArgument => 1,
            KernelStatus::DeviceAlloc => 2,
            KernelStatus::DeviceCopy => 3,
            KernelStatus::KernelLaunch => 4,
            KernelStatus::DeviceUnavailable => 5,
            KernelStatus::Internal => 99,
            KernelStatus::Unknown(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == KernelStatus::Success
    }

    /// Human-readable description
    pub fn describe(self) -> &'static str {
        match self {
            KernelStatus::Success => "success",
            KernelStatus::InvalidArgument => "invalid argument",
            KernelStatus::DeviceAlloc => "device memory allocation failed",
            KernelStatus::DeviceCopy => "host/device memory copy failed",
            KernelStatus::KernelLaunch => "kernel launch failed",
            KernelStatus::DeviceUnavailable => "accelerator device not available",
            KernelStatus::Internal => "internal error",
            KernelStatus::Unknown(_) => "unknown error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_code_is_preserved() {
        let status = KernelStatus::from_code(42);
        assert_eq!(status, KernelStatus::Unknown(42));
        assert_eq!(status.code(), 42);
        assert_eq!(status.describe(), "unknown error");
        assert!(!status.is_success());
    }

    #[test]
    fn test_device_unavailable() {
        assert_eq!(KernelStatus::from_code(5), KernelStatus::DeviceUnavailable);
        assert!(KernelStatus::from_code(0).is_success());
    }
}
