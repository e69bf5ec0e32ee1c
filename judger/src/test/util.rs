use std::{
    borrow::Cow,
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::runner::{
    model::{WorkerReply, WorkerRequest},
    Exchange, Isolate,
};

/// An [`Isolate`] that never runs anything. It answers with the exchanges it
/// was told to, in order, and remembers every request it got.
pub struct MockIsolate {
    answers: Mutex<VecDeque<Exchange>>,
    requests: Mutex<Vec<WorkerRequest>>,
    calls: AtomicUsize,
}

impl MockIsolate {
    pub fn new() -> MockIsolate {
        MockIsolate {
            answers: Mutex::new(VecDeque::new()),
            requests: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn answers(self, exchange: Exchange) -> MockIsolate {
        self.answers.lock().unwrap().push_back(exchange);
        self
    }

    pub fn replies(self, reply: WorkerReply) -> MockIsolate {
        self.answers(Exchange::Reply(reply))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<WorkerRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Isolate for MockIsolate {
    fn name(&self) -> Cow<'static, str> {
        "mock".into()
    }

    async fn exchange(&self, request: WorkerRequest, _timeout: Duration) -> Exchange {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockIsolate ran out of answers")
    }
}
