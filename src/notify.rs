/// Change-publication shared by every mutable storage component.
///
/// Callbacks run synchronously on whichever thread performed the mutation,
/// which during a scan is the worker thread. They must never block, or the
/// scan loop stalls with a bank lock held.
#[derive(Default)]
pub struct Notifier {
    observers: Vec<Box<dyn Fn() + Send>>,
}

impl Notifier {
    pub fn new() -> Self {
        Notifier::default()
    }

    pub fn subscribe(&mut self, observer: impl Fn() + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn notify(&self) {
        for observer in &self.observers {
            observer();
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn notifies_every_observer() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut notifier = Notifier::new();
        for _ in 0..3 {
            let count = Arc::clone(&count);
            notifier.subscribe(move || {
                count.fetch_add(1, Ordering::Relaxed);
            });
        }
        notifier.notify();
        notifier.notify();
        assert_eq!(count.load(Ordering::Relaxed), 6);
    }
}
