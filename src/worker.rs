//! Background search with a non-blocking poll.
//!
//! [`AsyncSearch`] owns one persistent worker thread. A request hands the
//! worker a private copy of the board; the interactive thread then calls
//! [`AsyncSearch::poll_result`] once per frame, which never blocks.
//!
//! ```text
//! Idle --request--> Running --reply--> Ready --poll--> Idle
//! ```
//!
//! If the worker panics or disappears the pending request is answered by a
//! short synchronous search, and failing that by a random empty cell.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use fastrand::Rng;
use tracing::{debug, error, warn};

use crate::board::{Board, Move, Stone};
use crate::config::EngineConfig;
use crate::constants::WORKER_THREAD_NAME;
use crate::error::SearchError;
use crate::mcts::search_move;
use crate::playout::{Playout, PlayoutPolicy};

/// Result of one [`AsyncSearch::poll_result`] call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchPoll {
    NotReady,
    Move(Move),
}

/// Observable orchestrator state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Running,
    Ready,
}

struct Job {
    ticket: u64,
    board: Board,
    stone: Stone,
    seed: u64,
}

struct Reply {
    ticket: u64,
    result: Result<Move, SearchError>,
}

struct Pending {
    ticket: u64,
    board: Board,
    stone: Stone,
}

enum Slot {
    Idle,
    Running(Pending),
    Ready(Move),
}

struct Worker {
    jobs: Sender<Job>,
    replies: Receiver<Reply>,
}

impl Worker {
    fn spawn<P>(playout: P, budget: usize) -> std::io::Result<Self>
    where
        P: Playout + Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                for job in job_rx {
                    debug!(ticket = job.ticket, "worker picked up search");
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        let mut rng = Rng::with_seed(job.seed);
                        search_move(&job.board, job.stone, budget, &playout, &mut rng)
                    }))
                    .unwrap_or_else(|payload| {
                        Err(SearchError::WorkerFailure(panic_message(payload.as_ref())))
                    });
                    let reply = Reply {
                        ticket: job.ticket,
                        result,
                    };
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                debug!("search worker exiting");
            })?;

        Ok(Self {
            jobs: job_tx,
            replies: reply_rx,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs searches on a dedicated worker thread for the interactive loop.
pub struct AsyncSearch<P> {
    playout: P,
    budget: usize,
    fallback_budget: usize,
    rng: Rng,
    worker: Option<Worker>,
    slot: Slot,
    next_ticket: u64,
}

impl AsyncSearch<PlayoutPolicy> {
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut search = Self::with_playout(
            config.policy,
            config.iterations,
            config.fallback_iterations,
        );
        search.rng = config.rng();
        search
    }
}

impl<P> AsyncSearch<P>
where
    P: Playout + Clone + Send + 'static,
{
    /// The worker thread is started by the first request.
    pub fn with_playout(playout: P, budget: usize, fallback_budget: usize) -> Self {
        Self {
            playout,
            budget,
            fallback_budget,
            rng: Rng::new(),
            worker: None,
            slot: Slot::Idle,
            next_ticket: 0,
        }
    }

    /// Reseed the generator that seeds each search.
    pub fn seed(&mut self, seed: u64) {
        self.rng.seed(seed);
    }

    pub fn state(&self) -> SearchState {
        match self.slot {
            Slot::Idle => SearchState::Idle,
            Slot::Running(_) => SearchState::Running,
            Slot::Ready(_) => SearchState::Ready,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.slot, Slot::Running(_))
    }

    /// Submit a search for `stone` on a copy of `board`.
    ///
    /// Only valid from `Idle`. Boards that are already decided are refused
    /// here so the worker never sees them.
    pub fn request_search(&mut self, board: &Board, stone: Stone) -> Result<(), SearchError> {
        if !matches!(self.slot, Slot::Idle) {
            return Err(SearchError::AlreadyRunning);
        }
        if self.budget == 0 {
            return Err(SearchError::InsufficientBudget);
        }
        if board.is_decided() {
            return Err(SearchError::TerminalBoard);
        }

        self.next_ticket += 1;
        let pending = Pending {
            ticket: self.next_ticket,
            board: board.clone(),
            stone,
        };
        let job = Job {
            ticket: pending.ticket,
            board: board.clone(),
            stone,
            seed: self.rng.u64(..),
        };

        self.slot = match self.submit(job) {
            Ok(()) => {
                debug!(ticket = pending.ticket, stone = stone.id(), "search submitted");
                Slot::Running(pending)
            }
            Err(err) => {
                warn!(%err, "could not reach the search worker, searching in place");
                self.settle(&pending)
            }
        };
        Ok(())
    }

    fn submit(&mut self, job: Job) -> Result<(), SearchError> {
        if self.worker.is_none() {
            let worker = Worker::spawn(self.playout.clone(), self.budget)
                .map_err(|e| SearchError::WorkerFailure(e.to_string()))?;
            self.worker = Some(worker);
        }
        let Some(worker) = &self.worker else {
            return Err(SearchError::WorkerFailure("no worker".to_string()));
        };
        if worker.jobs.send(job).is_err() {
            self.worker = None;
            return Err(SearchError::WorkerFailure("worker hung up".to_string()));
        }
        Ok(())
    }

    /// Non-blocking check for a result.
    ///
    /// A finished search moves the state to `Ready` and reports `NotReady`;
    /// the following poll hands out the move and returns to `Idle`.
    pub fn poll_result(&mut self) -> SearchPoll {
        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => SearchPoll::NotReady,
            Slot::Ready(mv) => SearchPoll::Move(mv),
            Slot::Running(pending) => {
                self.slot = self.check_worker(pending);
                SearchPoll::NotReady
            }
        }
    }

    fn check_worker(&mut self, pending: Pending) -> Slot {
        loop {
            let received = match &self.worker {
                Some(worker) => worker.replies.try_recv(),
                None => return self.settle(&pending),
            };
            match received {
                Ok(reply) if reply.ticket != pending.ticket => {
                    debug!(
                        ticket = reply.ticket,
                        expected = pending.ticket,
                        "discarding stale search result"
                    );
                }
                Ok(Reply {
                    result: Ok(mv), ..
                }) => {
                    debug!(ticket = pending.ticket, %mv, "search completed");
                    return Slot::Ready(mv);
                }
                Ok(Reply { result: Err(err), .. }) => {
                    warn!(%err, "search worker failed, falling back");
                    return self.settle(&pending);
                }
                Err(TryRecvError::Empty) => return Slot::Running(pending),
                Err(TryRecvError::Disconnected) => {
                    warn!("search worker is gone, falling back");
                    self.worker = None;
                    return self.settle(&pending);
                }
            }
        }
    }

    /// Answer `pending` on this thread, at most once.
    fn settle(&mut self, pending: &Pending) -> Slot {
        match self.fallback(pending) {
            Some(mv) => Slot::Ready(mv),
            None => {
                error!("no move available for a board that is not decided");
                Slot::Idle
            }
        }
    }

    fn fallback(&mut self, pending: &Pending) -> Option<Move> {
        let seed = self.rng.u64(..);
        let budget = self.fallback_budget;
        let playout = &self.playout;
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut rng = Rng::with_seed(seed);
            search_move(&pending.board, pending.stone, budget, playout, &mut rng)
        }));
        match result {
            Ok(Ok(mv)) => {
                debug!(%mv, budget, "fallback search produced a move");
                return Some(mv);
            }
            Ok(Err(err)) => warn!(%err, "fallback search failed"),
            Err(payload) => warn!(
                panic = panic_message(payload.as_ref()),
                "fallback search panicked"
            ),
        }

        let empty: Vec<Move> = pending.board.empty_cells().collect();
        let mv = self.rng.choice(empty)?;
        warn!(%mv, "playing a random empty cell");
        Some(mv)
    }

    /// Forget the outstanding request or unconsumed move. A search still
    /// running on the worker finishes and its reply is dropped as stale.
    pub fn discard(&mut self) {
        if let Slot::Running(pending) = &self.slot {
            debug!(ticket = pending.ticket, "outstanding search discarded");
        }
        self.slot = Slot::Idle;
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::playout::Outcome;

    fn opening() -> Board {
        let mut board = Board::new(9);
        board.place(Move::new(4, 4), Stone::Black).unwrap();
        board
    }

    fn wait_for_move<P>(search: &mut AsyncSearch<P>) -> Move
    where
        P: Playout + Clone + Send + 'static,
    {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            if let SearchPoll::Move(mv) = search.poll_result() {
                return mv;
            }
            assert!(Instant::now() < deadline, "search never finished");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[derive(Clone)]
    struct Slow;

    impl Playout for Slow {
        fn rollout(&self, _board: &Board, _mover: Stone, _rng: &mut Rng) -> Outcome {
            thread::sleep(Duration::from_millis(2));
            Outcome::Draw
        }
    }

    /// Panics only on the worker thread, so the fallback search succeeds.
    #[derive(Clone)]
    struct PanicsOnWorker;

    impl Playout for PanicsOnWorker {
        fn rollout(&self, _board: &Board, _mover: Stone, _rng: &mut Rng) -> Outcome {
            if thread::current().name() == Some(WORKER_THREAD_NAME) {
                panic!("rollout exploded");
            }
            Outcome::Draw
        }
    }

    #[derive(Clone)]
    struct AlwaysPanics;

    impl Playout for AlwaysPanics {
        fn rollout(&self, _board: &Board, _mover: Stone, _rng: &mut Rng) -> Outcome {
            panic!("rollout exploded");
        }
    }

    #[test]
    fn test_one_move_per_request() {
        let mut search = AsyncSearch::with_playout(PlayoutPolicy::Uniform, 200, 50);
        search.seed(5);
        let board = opening();
        search.request_search(&board, Stone::White).unwrap();
        assert_eq!(search.state(), SearchState::Running);

        let mv = wait_for_move(&mut search);
        assert_eq!(board.get(mv.row, mv.col), None);
        assert_eq!(search.state(), SearchState::Idle);
        for _ in 0..10 {
            assert_eq!(search.poll_result(), SearchPoll::NotReady);
        }
    }

    #[test]
    fn test_poll_does_not_block_while_running() {
        let mut search = AsyncSearch::with_playout(Slow, 100, 10);
        search.request_search(&opening(), Stone::White).unwrap();

        let start = Instant::now();
        assert_eq!(search.poll_result(), SearchPoll::NotReady);
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(search.is_running());

        wait_for_move(&mut search);
        assert!(!search.is_running());
    }

    #[test]
    fn test_ready_state_is_reported_before_move() {
        let mut search = AsyncSearch::with_playout(PlayoutPolicy::Uniform, 50, 10);
        search.request_search(&opening(), Stone::White).unwrap();
        while search.state() == SearchState::Running {
            assert_eq!(search.poll_result(), SearchPoll::NotReady);
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(search.state(), SearchState::Ready);
        assert!(matches!(search.poll_result(), SearchPoll::Move(_)));
    }

    #[test]
    fn test_second_request_is_refused() {
        let mut search = AsyncSearch::with_playout(Slow, 100, 10);
        let board = opening();
        search.request_search(&board, Stone::White).unwrap();
        assert_eq!(
            search.request_search(&board, Stone::White),
            Err(SearchError::AlreadyRunning)
        );
        wait_for_move(&mut search);
        assert_eq!(search.request_search(&board, Stone::White), Ok(()));
    }

    #[test]
    fn test_terminal_board_is_refused() {
        let mut board = Board::new(9);
        for col in 0..5 {
            board.place(Move::new(0, col), Stone::Black).unwrap();
        }
        let mut search = AsyncSearch::with_playout(PlayoutPolicy::Uniform, 100, 10);
        assert_eq!(
            search.request_search(&board, Stone::White),
            Err(SearchError::TerminalBoard)
        );
        assert_eq!(search.state(), SearchState::Idle);
    }

    #[test]
    fn test_worker_panic_falls_back_to_local_search() {
        let mut search = AsyncSearch::with_playout(PanicsOnWorker, 100, 20);
        let board = opening();
        search.request_search(&board, Stone::White).unwrap();
        let mv = wait_for_move(&mut search);
        assert_eq!(board.get(mv.row, mv.col), None);

        // The worker survives a caught panic and serves the next request.
        search.request_search(&board, Stone::White).unwrap();
        wait_for_move(&mut search);
    }

    #[test]
    fn test_random_cell_when_every_search_fails() {
        let mut search = AsyncSearch::with_playout(AlwaysPanics, 100, 20);
        let board = opening();
        search.request_search(&board, Stone::White).unwrap();
        let mv = wait_for_move(&mut search);
        assert!(board.in_bounds(mv.row, mv.col));
        assert_eq!(board.get(mv.row, mv.col), None);
    }

    #[test]
    fn test_discarded_result_is_never_delivered() {
        let mut search = AsyncSearch::with_playout(Slow, 60, 10);
        let board = opening();
        search.request_search(&board, Stone::White).unwrap();
        search.discard();
        assert_eq!(search.state(), SearchState::Idle);
        assert_eq!(search.poll_result(), SearchPoll::NotReady);

        // The new request queues behind the discarded one and only its own
        // result comes back.
        let mut next = board.clone();
        next.place(Move::new(0, 0), Stone::White).unwrap();
        search.request_search(&next, Stone::Black).unwrap();
        let mv = wait_for_move(&mut search);
        assert_eq!(next.get(mv.row, mv.col), None);
        assert_eq!(search.poll_result(), SearchPoll::NotReady);
    }

    #[test]
    fn test_empty_board_answers_center() {
        let config = EngineConfig {
            board_size: 9,
            iterations: 100,
            fallback_iterations: 10,
            seed: Some(1),
            ..EngineConfig::default()
        };
        let mut search = AsyncSearch::from_config(&config);
        search.request_search(&Board::new(9), Stone::Black).unwrap();
        assert_eq!(wait_for_move(&mut search), Move::new(4, 4));
    }
}
