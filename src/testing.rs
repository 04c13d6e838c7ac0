//! A host-side transport for tests
//!
//! Records every call, hands out `Vec` buffers, and lets tests script
//! occupancy samples and failures. Acquiring draws from a credit budget.
//! Once the budget is spent, `acquire()` either fails with `Cancelled`,
//! or blocks until the pool is destroyed or more credits are granted.

use std::cell::RefCell;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use std::vec::Vec;

use crate::config::StreamConfig;
use crate::header::{self, HeaderFlags, HEADER_LEN};
use crate::transport::{
    EndpointConfig, Occupancy, PoolConfig, Speed, Transport, TransportError,
};

/// A recorded transport call
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Op {
    Configure(EndpointConfig),
    Flush,
    CreatePool(PoolConfig),
    DestroyPool,
    StartTransfer,
    Acquire,
    Commit { len: usize },
    Discard,
    SetNak(bool),
    SetMultiplier(u8),
    DelayUs(u32),
    DelayMs(u32),
    DisableLowPower,
}

/// A committed buffer
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Committed {
    pub bytes: Vec<u8>,
}

impl Committed {
    pub fn flags(&self) -> HeaderFlags {
        header::flags(&self.bytes).expect("Committed buffer has a header")
    }
    pub fn fid(&self) -> bool {
        self.flags().contains(HeaderFlags::FID)
    }
    pub fn eof(&self) -> bool {
        self.flags().contains(HeaderFlags::EOF)
    }
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }
}

#[derive(Default)]
struct Inner {
    ops: Vec<Op>,
    committed: Vec<Committed>,
    pool: Option<PoolConfig>,
    credits: Option<usize>,
    block: bool,
    occupancy: Occupancy,
    commits: usize,
    fail_commit: Option<(usize, TransportError)>,
    fail_configure: Option<TransportError>,
    fail_create_pool: Option<TransportError>,
    fail_start: Option<TransportError>,
}

pub struct MockTransport {
    speed: Speed,
    inner: Mutex<Inner>,
    wake: Condvar,
}

impl MockTransport {
    pub fn new(speed: Speed) -> Self {
        MockTransport {
            speed,
            inner: Mutex::new(Inner::default()),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Start with an allocated pool, without recording it
    pub fn with_pool(self, config: &StreamConfig) -> Self {
        self.lock().pool = Some(config.pool());
        self
    }

    /// Hand out `credits` buffers, then fail with `Cancelled`
    pub fn with_credits(self, credits: usize) -> Self {
        self.lock().credits = Some(credits);
        self
    }

    /// Hand out `credits` buffers, then block in `acquire()`
    pub fn blocking(self, credits: usize) -> Self {
        {
            let mut inner = self.lock();
            inner.credits = Some(credits);
            inner.block = true;
        }
        self
    }

    /// Fail the `nth` commit (zero based) with `error`
    pub fn fail_commit(self, nth: usize, error: TransportError) -> Self {
        self.lock().fail_commit = Some((nth, error));
        self
    }

    pub fn fail_configure(self, error: TransportError) -> Self {
        self.lock().fail_configure = Some(error);
        self
    }

    pub fn fail_create_pool(self, error: TransportError) -> Self {
        self.lock().fail_create_pool = Some(error);
        self
    }

    pub fn fail_start(self, error: TransportError) -> Self {
        self.lock().fail_start = Some(error);
        self
    }

    pub fn set_occupancy(&self, occupancy: Occupancy) {
        self.lock().occupancy = occupancy;
    }

    /// Allow `credits` more acquisitions
    pub fn grant(&self, credits: usize) {
        let mut inner = self.lock();
        inner.credits = Some(inner.credits.unwrap_or(0) + credits);
        self.wake.notify_all();
    }

    /// Returns a buffer from the pool, without recording or spending credits
    pub fn acquire_buffer(&self) -> Vec<u8> {
        let pool = self.lock().pool.expect("Pool allocated");
        std::vec![0; pool.size]
    }

    pub fn ops(&self) -> Vec<Op> {
        self.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    pub fn committed(&self) -> Vec<Committed> {
        self.lock().committed.clone()
    }

    pub fn has_pool(&self) -> bool {
        self.lock().pool.is_some()
    }

    /// Wait until `cond` holds for the recorded calls
    ///
    /// Panics after a few seconds.
    pub fn wait_for(&self, mut cond: impl FnMut(&[Op]) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut inner = self.lock();
        while !cond(inner.ops.as_slice()) {
            let timeout = deadline.saturating_duration_since(Instant::now());
            assert!(!timeout.is_zero(), "Timed out waiting on transport");
            inner = self.wake.wait_timeout(inner, timeout).unwrap().0;
        }
    }

    fn record(&self, inner: &mut Inner, op: Op) {
        inner.ops.push(op);
        self.wake.notify_all();
    }
}

impl Transport for MockTransport {
    type Buffer = Vec<u8>;

    fn speed(&self) -> Speed {
        self.speed
    }

    fn configure_endpoint(&self, config: &EndpointConfig) -> Result<(), TransportError> {
        let mut inner = self.lock();
        self.record(&mut inner, Op::Configure(*config));
        match inner.fail_configure {
            Some(error) if config.enable => Err(error),
            _ => Ok(()),
        }
    }

    fn flush_endpoint(&self) {
        let mut inner = self.lock();
        self.record(&mut inner, Op::Flush);
    }

    fn create_pool(&self, pool: &PoolConfig) -> Result<(), TransportError> {
        let mut inner = self.lock();
        self.record(&mut inner, Op::CreatePool(*pool));
        if let Some(error) = inner.fail_create_pool {
            return Err(error);
        }
        inner.pool = Some(*pool);
        Ok(())
    }

    fn destroy_pool(&self) {
        let mut inner = self.lock();
        inner.pool = None;
        self.record(&mut inner, Op::DestroyPool);
    }

    fn start_transfer(&self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        self.record(&mut inner, Op::StartTransfer);
        match inner.fail_start {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn acquire(&self) -> Result<Vec<u8>, TransportError> {
        let mut inner = self.lock();
        self.record(&mut inner, Op::Acquire);
        loop {
            let pool = inner.pool.ok_or(TransportError::Cancelled)?;
            let credits = inner.credits;
            match credits {
                None => return Ok(std::vec![0; pool.size]),
                Some(credits) if credits > 0 => {
                    inner.credits = Some(credits - 1);
                    return Ok(std::vec![0; pool.size]);
                }
                Some(_) if !inner.block => return Err(TransportError::Cancelled),
                Some(_) => inner = self.wake.wait(inner).unwrap(),
            }
        }
    }

    fn commit(&self, buffer: Vec<u8>, len: usize) -> Result<(), TransportError> {
        let mut inner = self.lock();
        self.record(&mut inner, Op::Commit { len });
        let nth = inner.commits;
        inner.commits += 1;
        if let Some((fail, error)) = inner.fail_commit {
            if fail == nth {
                return Err(error);
            }
        }
        if inner.pool.is_none() {
            return Err(TransportError::Cancelled);
        }
        inner.committed.push(Committed {
            bytes: buffer[..len].to_vec(),
        });
        Ok(())
    }

    fn discard(&self, _: Vec<u8>) {
        let mut inner = self.lock();
        self.record(&mut inner, Op::Discard);
    }

    fn set_nak(&self, nak: bool) {
        let mut inner = self.lock();
        self.record(&mut inner, Op::SetNak(nak));
    }

    fn occupancy(&self) -> Occupancy {
        self.lock().occupancy
    }

    fn set_multiplier(&self, mult: u8) {
        let mut inner = self.lock();
        self.record(&mut inner, Op::SetMultiplier(mult));
    }

    fn delay_us(&self, us: u32) {
        let mut inner = self.lock();
        self.record(&mut inner, Op::DelayUs(us));
    }

    fn delay_ms(&self, ms: u32) {
        let mut inner = self.lock();
        self.record(&mut inner, Op::DelayMs(ms));
    }

    fn disable_low_power(&self) {
        let mut inner = self.lock();
        self.record(&mut inner, Op::DisableLowPower);
    }
}

/// Runs `action` once, during the first millisecond sleep
///
/// Everything else goes straight to the wrapped [`MockTransport`]. Use it
/// to land a control event inside the engine's pacing wait.
pub struct DuringSleep<'a, F> {
    mock: &'a MockTransport,
    action: RefCell<Option<F>>,
}

impl<'a, F: FnOnce()> DuringSleep<'a, F> {
    pub fn new(mock: &'a MockTransport, action: F) -> Self {
        DuringSleep {
            mock,
            action: RefCell::new(Some(action)),
        }
    }
}

impl<F: FnOnce()> Transport for DuringSleep<'_, F> {
    type Buffer = Vec<u8>;

    fn speed(&self) -> Speed {
        self.mock.speed()
    }
    fn configure_endpoint(&self, config: &EndpointConfig) -> Result<(), TransportError> {
        self.mock.configure_endpoint(config)
    }
    fn flush_endpoint(&self) {
        self.mock.flush_endpoint()
    }
    fn create_pool(&self, pool: &PoolConfig) -> Result<(), TransportError> {
        self.mock.create_pool(pool)
    }
    fn destroy_pool(&self) {
        self.mock.destroy_pool()
    }
    fn start_transfer(&self) -> Result<(), TransportError> {
        self.mock.start_transfer()
    }
    fn acquire(&self) -> Result<Vec<u8>, TransportError> {
        self.mock.acquire()
    }
    fn commit(&self, buffer: Vec<u8>, len: usize) -> Result<(), TransportError> {
        self.mock.commit(buffer, len)
    }
    fn discard(&self, buffer: Vec<u8>) {
        self.mock.discard(buffer)
    }
    fn set_nak(&self, nak: bool) {
        self.mock.set_nak(nak)
    }
    fn occupancy(&self) -> Occupancy {
        self.mock.occupancy()
    }
    fn set_multiplier(&self, mult: u8) {
        self.mock.set_multiplier(mult)
    }
    fn delay_us(&self, us: u32) {
        self.mock.delay_us(us)
    }
    fn delay_ms(&self, ms: u32) {
        self.mock.delay_ms(ms);
        let action = self.action.borrow_mut().take();
        if let Some(action) = action {
            action();
        }
    }
    fn disable_low_power(&self) {
        self.mock.disable_low_power()
    }
}
