//! A tiny scoped buffer pool (§9 design note, "Scoped buffer release").
//! `acquire()` hands out a guard whose backing `Vec<u8>` is cleared and
//! returned to the pool on drop, on every exit path including early
//! returns from an encode error.

use std::cell::RefCell;

#[derive(Debug, Default)]
pub struct BufferPool {
    free: RefCell<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> PooledBuf<'_> {
        let buf = self.free.borrow_mut().pop().unwrap_or_default();
        PooledBuf {
            pool: self,
            buf: Some(buf),
        }
    }
}

pub struct PooledBuf<'a> {
    pool: &'a BufferPool,
    buf: Option<Vec<u8>>,
}

impl<'a> PooledBuf<'a> {
    pub fn get_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().expect("buffer taken before drop")
    }
}

impl<'a> Drop for PooledBuf<'a> {
    fn drop(&mut self) {
        if let Some(mut buf) = self.buf.take() {
            buf.clear();
            self.pool.free.borrow_mut().push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_returns_to_pool_on_drop() {
        let pool = BufferPool::new();
        {
            let mut guard = pool.acquire();
            guard.get_mut().extend_from_slice(b"hello");
        }
        assert_eq!(pool.free.borrow().len(), 1);
        assert!(pool.free.borrow()[0].is_empty());
    }
}
