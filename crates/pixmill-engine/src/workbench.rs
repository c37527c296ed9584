//! The host-driven scheduler: targets, their queues, and event delivery.
//!
//! A [`Workbench`] owns every attached [`Surface`] together with its
//! [`JobQueue`] and save/restore slot. Nothing runs on its own: the host
//! calls [`Workbench::tick`] whenever it has a spare moment (an animation
//! frame, an idle callback, a loop iteration), and each tick gives every
//! busy target one time slice. Submission to an idle target runs the
//! first slice immediately.
//!
//! ```rust
//! # use pixmill_engine::{Command, FilterEvent, FilterRequest, Workbench};
//! # use pixmill_engine::surface::{EncodeFormat, Surface, SurfaceError};
//! # use pixmill_engine::types::{Rgba, RgbaImage};
//! # struct Canvas(RgbaImage);
//! # impl Surface for Canvas {
//! #     fn read_pixels(&self) -> Result<RgbaImage, SurfaceError> { Ok(self.0.clone()) }
//! #     fn write_pixels(&mut self, p: &RgbaImage) -> Result<(), SurfaceError> { self.0 = p.clone(); Ok(()) }
//! #     fn encode(&self, _: EncodeFormat) -> Result<String, SurfaceError> { Ok(String::new()) }
//! #     fn load_encoded(&mut self, _: &str) -> Result<(), SurfaceError> { Ok(()) }
//! # }
//! let mut bench = Workbench::new();
//! let target = bench.attach(Canvas(RgbaImage::from_pixel(4, 4, Rgba([10, 200, 50, 255]))));
//! bench.submit(target, FilterRequest::new(Command::Negate))?;
//! bench.run_until_idle();
//! assert!(bench.take_events().last().is_some_and(FilterEvent::is_terminal));
//! # Ok::<(), pixmill_engine::FilterError>(())
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::events::FilterEvent;
use crate::operation::{Advance, Operation};
use crate::options::FilterRequest;
use crate::queue::JobQueue;
use crate::rng;
use crate::surface::Surface;
use crate::types::{FilterError, TargetId};

/// Multiplier spreading consecutive job numbers across the seed space.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

struct Target<I> {
    surface: Box<dyn Surface>,
    backup: Option<String>,
    queue: JobQueue<I>,
}

/// Targets plus their queues, driven cooperatively by the host.
pub struct Workbench<C: Clock = SystemClock> {
    clock: C,
    targets: BTreeMap<TargetId, Target<C::Instant>>,
    next_target: u64,
    jobs: u64,
    seed_base: u64,
    events: Vec<FilterEvent>,
}

impl Default for Workbench<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbench<SystemClock> {
    /// A workbench timed by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> Workbench<C> {
    /// A workbench timed by `clock`.
    #[must_use]
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            targets: BTreeMap::new(),
            next_target: 0,
            jobs: 0,
            seed_base: rng::seed_from_time(),
            events: Vec::new(),
        }
    }

    /// Fix the base used to seed `noise` jobs that carry no `seed`.
    #[must_use]
    pub const fn with_seed_base(mut self, seed_base: u64) -> Self {
        self.seed_base = seed_base;
        self
    }

    /// The clock driving slice budgets.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Attach a target and return its handle.
    pub fn attach(&mut self, surface: impl Surface + 'static) -> TargetId {
        let id = TargetId::new(self.next_target);
        self.next_target += 1;
        self.targets.insert(
            id,
            Target {
                surface: Box::new(surface),
                backup: None,
                queue: JobQueue::new(),
            },
        );
        debug!(target_id = %id, "attached target");
        id
    }

    /// Detach a target, dropping anything still queued on it.
    pub fn detach(&mut self, id: TargetId) -> Option<Box<dyn Surface>> {
        self.targets.remove(&id).map(|target| {
            if !target.queue.is_empty() {
                warn!(target_id = %id, "detached target with queued work");
            }
            target.surface
        })
    }

    /// The surface behind `id`.
    #[must_use]
    pub fn surface(&self, id: TargetId) -> Option<&dyn Surface> {
        self.targets.get(&id).map(|t| t.surface.as_ref())
    }

    /// The saved snapshot for `id`, if a `save` has run.
    #[must_use]
    pub fn backup(&self, id: TargetId) -> Option<&str> {
        self.targets.get(&id).and_then(|t| t.backup.as_deref())
    }

    /// Jobs waiting behind the active one on `id`.
    #[must_use]
    pub fn pending(&self, id: TargetId) -> usize {
        self.targets.get(&id).map_or(0, |t| t.queue.pending_len())
    }

    /// Whether no target has work.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.targets.values().all(|t| t.queue.is_empty())
    }

    /// Validate and enqueue a filter on `id`.
    ///
    /// If the target is idle the job starts now and its first slice runs
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownTarget`] for an unattached id and
    /// [`FilterError::InvalidConfig`] for options that describe no
    /// runnable filter. Nothing is queued in either case.
    #[tracing::instrument(skip(self, request))]
    pub fn submit(
        &mut self,
        id: TargetId,
        request: impl Into<FilterRequest>,
    ) -> Result<(), FilterError> {
        if !self.targets.contains_key(&id) {
            return Err(FilterError::UnknownTarget(id));
        }
        self.jobs += 1;
        let seed = self.seed_base ^ self.jobs.wrapping_mul(SEED_STRIDE);
        let operation = Operation::new(request.into(), seed)?;
        debug!(filter = %operation.command(), "queued");

        let Some(target) = self.targets.get_mut(&id) else {
            return Err(FilterError::UnknownTarget(id));
        };
        let idle = target.queue.is_idle();
        target.queue.push(operation);
        if idle {
            self.run_target(id);
        }
        Ok(())
    }

    /// Give every busy target one slice.
    ///
    /// Returns `true` while any target still has work.
    pub fn tick(&mut self) -> bool {
        let busy: Vec<TargetId> = self
            .targets
            .iter()
            .filter(|(_, t)| !t.queue.is_idle())
            .map(|(id, _)| *id)
            .collect();
        for id in busy {
            self.run_target(id);
        }
        !self.is_idle()
    }

    /// Tick until every queue is empty.
    pub fn run_until_idle(&mut self) {
        while self.tick() {}
    }

    /// Drain the events emitted so far.
    pub fn take_events(&mut self) -> Vec<FilterEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run one slice on `id`, starting queued jobs as earlier ones end.
    ///
    /// Jobs that finish within their first slice hand over to the next
    /// queued job in the same call, so a run of instant commands
    /// (`save`, `restore`, ...) drains without waiting for ticks.
    #[tracing::instrument(skip(self))]
    fn run_target(&mut self, id: TargetId) {
        let Self {
            clock,
            targets,
            events,
            ..
        } = self;
        let clock: &C = clock;
        let Some(target) = targets.get_mut(&id) else {
            return;
        };
        loop {
            if target.queue.is_idle() {
                let Some(job) = target.queue.start_next(clock.now()) else {
                    return;
                };
                let filter = job.operation.command();
                debug!(%filter, "start");
                events.push(FilterEvent::Start { target: id, filter });
            }
            let Some(job) = target.queue.active_mut() else {
                return;
            };
            let filter = job.operation.command();
            match job
                .operation
                .advance(target.surface.as_mut(), &mut target.backup, clock)
            {
                Ok(Advance::Yielded { fraction }) => {
                    debug!(%filter, fraction, "yield");
                    events.push(FilterEvent::Progress {
                        target: id,
                        filter,
                        f: fraction,
                    });
                    return;
                }
                Ok(Advance::Complete(_)) => {
                    let time = clock.elapsed(&job.started);
                    target.queue.finish_active();
                    let pending = target.queue.pending_len();
                    info!(%filter, ?time, pending, "complete");
                    events.push(FilterEvent::Complete {
                        target: id,
                        filter,
                        time,
                        pending,
                    });
                }
                Err(error) => {
                    target.queue.finish_active();
                    warn!(%filter, %error, "failed");
                    events.push(FilterEvent::Failed {
                        target: id,
                        filter,
                        error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::options::{Command, FilterOptions};
    use crate::surface::{EncodeFormat, SurfaceError};
    use crate::types::{Rgba, RgbaImage};

    struct Canvas(Option<RgbaImage>);

    impl Surface for Canvas {
        fn read_pixels(&self) -> Result<RgbaImage, SurfaceError> {
            self.0
                .clone()
                .ok_or_else(|| SurfaceError::Unsupported("no pixels".to_owned()))
        }

        fn write_pixels(&mut self, pixels: &RgbaImage) -> Result<(), SurfaceError> {
            self.0 = Some(pixels.clone());
            Ok(())
        }

        fn encode(&self, _format: EncodeFormat) -> Result<String, SurfaceError> {
            Ok(String::new())
        }

        fn load_encoded(&mut self, _encoded: &str) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    fn canvas(red: u8) -> Canvas {
        Canvas(Some(RgbaImage::from_pixel(3, 4, Rgba([red, 0, 0, 255]))))
    }

    fn sliced(command: Command) -> FilterOptions {
        let mut options = FilterOptions::new(command);
        options.interval = Duration::ZERO;
        options
    }

    fn red(bench: &Workbench, id: TargetId) -> u8 {
        bench.surface(id).unwrap().read_pixels().unwrap().get_pixel(0, 0).0[0]
    }

    #[test]
    fn unknown_target_is_rejected() {
        let mut bench = Workbench::new();
        let err = bench
            .submit(TargetId::new(7), Command::Negate)
            .unwrap_err();
        assert_eq!(err, FilterError::UnknownTarget(TargetId::new(7)));
    }

    #[test]
    fn invalid_config_is_not_queued() {
        let mut bench = Workbench::new();
        let id = bench.attach(canvas(0));
        let mut options = FilterOptions::new(Command::Matrix);
        options.matrix = vec![vec![1.0; 3]; 2];
        assert!(bench.submit(id, options).is_err());
        assert!(bench.is_idle());
        assert!(bench.take_events().is_empty());
    }

    #[test]
    fn first_slice_runs_at_submission() {
        let mut bench = Workbench::new();
        let id = bench.attach(canvas(0));
        bench.submit(id, sliced(Command::Negate)).unwrap();
        let events = bench.take_events();
        assert_eq!(
            events,
            vec![
                FilterEvent::Start {
                    target: id,
                    filter: Command::Negate
                },
                FilterEvent::Progress {
                    target: id,
                    filter: Command::Negate,
                    f: 0.25
                },
            ]
        );
        assert!(!bench.is_idle());
    }

    #[test]
    fn sync_job_completes_inside_submit() {
        let mut bench = Workbench::new();
        let id = bench.attach(canvas(10));
        let mut options = sliced(Command::Negate);
        options.sync = true;
        bench.submit(id, options).unwrap();
        assert!(bench.is_idle());
        assert_eq!(red(&bench, id), 245);
        let events = bench.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], FilterEvent::Complete { pending: 0, .. }));
    }

    #[test]
    fn queued_jobs_run_in_order() {
        let mut bench = Workbench::new();
        let id = bench.attach(canvas(10));
        let order = Rc::new(RefCell::new(Vec::new()));
        for command in [Command::Negate, Command::Brightness, Command::Negate] {
            let log = Rc::clone(&order);
            let mut options = sliced(command);
            if command == Command::Brightness {
                options.bias = 5.0;
            }
            let request = FilterRequest::from(options).with_reducer(move |surface, _| {
                let red = surface.read_pixels().unwrap().get_pixel(0, 0).0[0];
                log.borrow_mut().push(red);
            });
            bench.submit(id, request).unwrap();
        }
        assert_eq!(bench.pending(id), 2);
        bench.run_until_idle();
        // 10 -> 245 -> 250 -> 5
        assert_eq!(*order.borrow(), vec![245, 250, 5]);

        let events = bench.take_events();
        let terminal: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FilterEvent::Complete {
                    filter, pending, ..
                } => Some((*filter, *pending)),
                _ => None,
            })
            .collect();
        assert_eq!(
            terminal,
            vec![
                (Command::Negate, 2),
                (Command::Brightness, 1),
                (Command::Negate, 0)
            ]
        );
    }

    #[test]
    fn events_are_well_formed_per_operation() {
        let mut bench = Workbench::new();
        let id = bench.attach(canvas(0));
        bench.submit(id, sliced(Command::Blur)).unwrap();
        bench.submit(id, sliced(Command::Save)).unwrap();
        bench.run_until_idle();
        let events = bench.take_events();

        let mut open: Option<Command> = None;
        let mut last_f = 0.0;
        for event in &events {
            match event {
                FilterEvent::Start { filter, .. } => {
                    assert!(open.is_none(), "start while another op is open");
                    open = Some(*filter);
                    last_f = 0.0;
                }
                FilterEvent::Progress { filter, f, .. } => {
                    assert_eq!(open, Some(*filter));
                    assert!(*f > last_f);
                    last_f = *f;
                }
                FilterEvent::Complete { filter, .. } | FilterEvent::Failed { filter, .. } => {
                    assert_eq!(open.take(), Some(*filter));
                }
            }
        }
        assert!(open.is_none());
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 2);
    }

    #[test]
    fn unsupported_target_fails_and_queue_advances() {
        let mut bench = Workbench::new();
        let id = bench.attach(Canvas(None));
        bench.submit(id, Command::Blur).unwrap();
        bench.submit(id, Command::Restore).unwrap();
        bench.run_until_idle();
        let events = bench.take_events();
        assert!(matches!(
            &events[1],
            FilterEvent::Failed {
                error: FilterError::UnsupportedTarget(_),
                ..
            }
        ));
        assert!(matches!(
            events.last(),
            Some(FilterEvent::Complete {
                filter: Command::Restore,
                ..
            })
        ));
    }

    #[test]
    fn targets_interleave() {
        let mut bench = Workbench::new();
        let a = bench.attach(canvas(0));
        let b = bench.attach(canvas(0));
        bench.submit(a, sliced(Command::Negate)).unwrap();
        bench.submit(b, sliced(Command::Negate)).unwrap();
        bench.take_events();

        assert!(bench.tick());
        let events = bench.take_events();
        let targets: Vec<TargetId> = events.iter().map(FilterEvent::target).collect();
        assert_eq!(targets, vec![a, b]);
    }

    #[test]
    fn detach_returns_surface() {
        let mut bench = Workbench::new();
        let id = bench.attach(canvas(3));
        let surface = bench.detach(id).unwrap();
        assert_eq!(surface.read_pixels().unwrap().get_pixel(0, 0).0[0], 3);
        assert!(bench.surface(id).is_none());
        assert!(bench.detach(id).is_none());
    }
}
