//! `SleepPort` over `setTimeout`.

use async_trait::async_trait;
use gloo_timers::future::TimeoutFuture;

use tutor_core::ports::SleepPort;

pub struct GlooSleeper;

#[async_trait(?Send)]
impl SleepPort for GlooSleeper {
    async fn sleep(&self, ms: u64) {
        TimeoutFuture::new(ms.min(u32::MAX as u64) as u32).await;
    }
}
