//! Hero slideshow state.
//!
//! The carousel advances on a fixed autoplay interval. Any manual
//! navigation pauses autoplay for a fixed period. The index always stays
//! inside `0..slide_count` and wraps in both directions.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Clone)]
pub struct HeroCarousel {
    slide_count: usize,
    index: usize,
    autoplay_interval: Duration,
    pause_after_interaction: Duration,
    paused_until: Option<Instant>,
    last_advance: Instant,
}

/// Timing a client needs to drive the same carousel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AutoplaySettings {
    pub enabled: bool,
    pub start_index: usize,
    pub interval_ms: u64,
    pub pause_after_interaction_ms: u64,
}

impl HeroCarousel {
    pub fn new(
        slide_count: usize,
        autoplay_interval: Duration,
        pause_after_interaction: Duration,
        now: Instant,
    ) -> Self {
        Self {
            slide_count,
            index: 0,
            autoplay_interval,
            pause_after_interaction,
            paused_until: None,
            last_advance: now,
        }
    }

    pub fn current(&self) -> usize {
        self.index
    }

    pub fn slide_count(&self) -> usize {
        self.slide_count
    }

    pub fn is_paused(&self, now: Instant) -> bool {
        self.paused_until.map_or(false, |until| now < until)
    }

    pub fn settings(&self) -> AutoplaySettings {
        AutoplaySettings {
            enabled: self.slide_count > 1,
            start_index: self.index,
            interval_ms: self.autoplay_interval.as_millis() as u64,
            pause_after_interaction_ms: self.pause_after_interaction.as_millis() as u64,
        }
    }

    pub fn next(&mut self, now: Instant) -> usize {
        if self.slide_count > 0 {
            self.index = (self.index + 1) % self.slide_count;
        }
        self.interacted(now);
        self.index
    }

    pub fn prev(&mut self, now: Instant) -> usize {
        if self.slide_count > 0 {
            self.index = (self.index + self.slide_count - 1) % self.slide_count;
        }
        self.interacted(now);
        self.index
    }

    /// Jumps to `index`, wrapping out-of-range values.
    pub fn go_to(&mut self, index: usize, now: Instant) -> usize {
        if self.slide_count > 0 {
            self.index = index % self.slide_count;
        }
        self.interacted(now);
        self.index
    }

    /// Autoplay step. Returns true when the slide changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.slide_count < 2 || self.is_paused(now) {
            return false;
        }
        if now.duration_since(self.last_advance) < self.autoplay_interval {
            return false;
        }
        self.index = (self.index + 1) % self.slide_count;
        self.last_advance = now;
        self.paused_until = None;
        true
    }

    fn interacted(&mut self, now: Instant) {
        self.paused_until = Some(now + self.pause_after_interaction);
        self.last_advance = now;
    }

    /// Moves the carousel into a task that owns it. The task advances on the
    /// autoplay interval and applies navigation commands; the current index
    /// is published on the returned watch channel.
    pub fn spawn_autoplay(mut self) -> CarouselHandle {
        let (index_tx, index_rx) = watch::channel(self.index);
        let (command_tx, mut command_rx) = mpsc::channel::<CarouselCommand>(16);
        let period = self.autoplay_interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if self.tick(Instant::now()) {
                            debug!(index = self.index, "hero carousel advanced");
                            let _ = index_tx.send(self.index);
                        }
                    }
                    command = command_rx.recv() => {
                        let now = Instant::now();
                        match command {
                            Some(CarouselCommand::Next) => { self.next(now); }
                            Some(CarouselCommand::Prev) => { self.prev(now); }
                            Some(CarouselCommand::GoTo(i)) => { self.go_to(i, now); }
                            Some(CarouselCommand::Stop) | None => break,
                        }
                        let _ = index_tx.send(self.index);
                    }
                }
            }
        });

        CarouselHandle {
            index: index_rx,
            commands: command_tx,
            task,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselCommand {
    Next,
    Prev,
    GoTo(usize),
    Stop,
}

pub struct CarouselHandle {
    pub index: watch::Receiver<usize>,
    pub commands: mpsc::Sender<CarouselCommand>,
    pub task: JoinHandle<()>,
}

impl CarouselHandle {
    pub fn current(&self) -> usize {
        *self.index.borrow()
    }

    pub async fn send(&self, command: CarouselCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub async fn stop(self) {
        let _ = self.commands.send(CarouselCommand::Stop).await;
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const INTERVAL: Duration = Duration::from_secs(5);
    const PAUSE: Duration = Duration::from_secs(5);

    fn carousel(n: usize) -> (HeroCarousel, Instant) {
        let now = Instant::now();
        (HeroCarousel::new(n, INTERVAL, PAUSE, now), now)
    }

    #[test]
    fn wraps_both_directions() {
        let (mut c, now) = carousel(3);
        assert_eq!(c.prev(now), 2);
        assert_eq!(c.next(now), 0);
        assert_eq!(c.go_to(7, now), 1);
    }

    #[test]
    fn empty_carousel_stays_at_zero() {
        let (mut c, now) = carousel(0);
        assert_eq!(c.next(now), 0);
        assert_eq!(c.prev(now), 0);
        assert!(!c.tick(now + INTERVAL * 3));
        assert!(!c.settings().enabled);
    }

    #[test]
    fn autoplay_advances_after_interval() {
        let (mut c, start) = carousel(3);
        assert!(!c.tick(start + Duration::from_secs(4)));
        assert!(c.tick(start + INTERVAL));
        assert_eq!(c.current(), 1);
    }

    #[test]
    fn manual_navigation_pauses_autoplay() {
        let (mut c, start) = carousel(4);
        let touched = start + Duration::from_secs(4);
        c.next(touched);
        assert!(c.is_paused(touched + Duration::from_secs(1)));
        assert!(!c.tick(touched + Duration::from_secs(4)));
        assert!(c.tick(touched + PAUSE));
        assert_eq!(c.current(), 2);
    }

    proptest! {
        #[test]
        fn index_always_in_range(n in 1usize..20, steps in proptest::collection::vec(0u8..3, 0..60)) {
            let (mut c, now) = carousel(n);
            let mut expected: i64 = 0;
            for step in steps {
                match step {
                    0 => { c.next(now); expected += 1; }
                    1 => { c.prev(now); expected -= 1; }
                    _ => {}
                }
                prop_assert!(c.current() < n);
                prop_assert_eq!(c.current() as i64, expected.rem_euclid(n as i64));
            }
        }

        #[test]
        fn n_nexts_return_to_start(n in 1usize..20) {
            let (mut c, now) = carousel(n);
            for _ in 0..n { c.next(now); }
            prop_assert_eq!(c.current(), 0);
            for _ in 0..n { c.prev(now); }
            prop_assert_eq!(c.current(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_carousel_publishes_index() {
        let c = HeroCarousel::new(3, INTERVAL, PAUSE, Instant::now());
        let mut handle = c.spawn_autoplay();

        time::sleep(INTERVAL + Duration::from_millis(10)).await;
        handle.index.changed().await.unwrap();
        assert_eq!(handle.current(), 1);

        assert!(handle.send(CarouselCommand::Prev).await);
        handle.index.changed().await.unwrap();
        assert_eq!(handle.current(), 0);

        handle.stop().await;
    }
}
