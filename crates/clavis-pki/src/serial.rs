//! 证书序列号
//!
//! 序列号取自签发时刻的毫秒时间戳（大端、正整数）。[`SerialNumber::next`]
//! 在同一进程内保证严格递增：同一毫秒内或时钟回拨时取 `上一个 + 1`。
//! 跨进程不保证唯一。

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use rsa::BigUint;
use x509_cert::serial_number::SerialNumber as X509SerialNumber;

use crate::error::{PkiError, Result};

static LAST_ISSUED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerialNumber(u64);

impl SerialNumber {
    /// 当前时间的毫秒数
    pub fn now() -> Self {
        Self(now_millis())
    }

    /// 签发用序列号：`max(now, last + 1)`
    pub fn next() -> Self {
        let now = now_millis();
        let mut last = LAST_ISSUED.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match LAST_ISSUED.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(candidate),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from(self.0)
    }

    /// 最短大端表示
    pub fn to_bytes(&self) -> Vec<u8> {
        let bytes = self.0.to_be_bytes();
        let first = bytes
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(bytes.len() - 1);
        bytes[first..].to_vec()
    }

    /// DER INTEGER 形式
    pub fn to_x509(&self) -> Result<X509SerialNumber> {
        X509SerialNumber::new(&self.0.to_be_bytes())
            .map_err(|e| PkiError::signing("Failed to encode serial number", e))
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_wall_clock_millis() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let serial = SerialNumber::now();
        assert!(serial.as_u64() >= before);
    }

    #[test]
    fn test_next_is_strictly_increasing() {
        let serials: Vec<_> = (0..1_000).map(|_| SerialNumber::next()).collect();
        for pair in serials.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_encodings() {
        let serial = SerialNumber::from_u64(0x0102_0304);
        assert_eq!(serial.to_bytes(), vec![1, 2, 3, 4]);
        assert_eq!(serial.to_biguint(), BigUint::from(0x0102_0304u64));
        assert_eq!(SerialNumber::from_u64(0).to_bytes(), vec![0]);

        let der = serial.to_x509().unwrap();
        assert_eq!(BigUint::from_bytes_be(der.as_bytes()), serial.to_biguint());
    }
}
