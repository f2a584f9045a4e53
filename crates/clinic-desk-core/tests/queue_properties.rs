//! Property tests for token numbering and serving order.

use clinic_desk_core::db::Database;
use clinic_desk_core::models::{Actor, NewPatient, Patient};
use clinic_desk_core::queue::QueueManager;
use proptest::prelude::*;

fn reception() -> Actor {
    Actor::new("uid-1", "Reception")
}

fn queue_with_patient() -> (QueueManager<Database>, String) {
    let db = Database::open_in_memory().unwrap();
    let patient = Patient::new(
        NewPatient {
            name: "Asha Rao".into(),
            ..Default::default()
        },
        reception(),
    );
    db.insert_patient(&patient).unwrap();
    (QueueManager::load(db, "clinic").unwrap(), patient.id)
}

/// A front-desk action.
#[derive(Debug, Clone)]
enum Action {
    Enqueue,
    ServeNext,
    /// Serve the pending token at this position (modulo pending count)
    ServeAt(usize),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => Just(Action::Enqueue),
        2 => Just(Action::ServeNext),
        1 => (0..8usize).prop_map(Action::ServeAt),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn enqueue_numbers_are_one_to_n(n in 1..40usize) {
        let (mut queue, patient_id) = queue_with_patient();

        let numbers: Vec<u32> = (0..n)
            .map(|_| queue.enqueue(&patient_id, "Consultation", None, &reception()).unwrap().number)
            .collect();

        let expected: Vec<u32> = (1..=n as u32).collect();
        prop_assert_eq!(numbers, expected);
        prop_assert_eq!(queue.state().current_token_number, n as u32);
    }

    #[test]
    fn serving_keeps_queue_invariants(actions in proptest::collection::vec(action(), 1..60)) {
        let (mut queue, patient_id) = queue_with_patient();
        let mut issued = 0u32;

        for action in actions {
            let before = queue.state();
            match action {
                Action::Enqueue => {
                    let token = queue.enqueue(&patient_id, "Consultation", None, &reception()).unwrap();
                    issued += 1;
                    prop_assert_eq!(token.number, issued);
                }
                Action::ServeNext => {
                    let lowest = queue.pending_tokens().first().map(|t| t.number);
                    match queue.serve_next(&reception()).unwrap() {
                        Some(served) => {
                            prop_assert_eq!(Some(served.number), lowest);
                            prop_assert_eq!(queue.state().last_served_token, served.number);
                            prop_assert!(queue.pending_tokens().iter().all(|t| t.id != served.id));
                            prop_assert!(queue.completed_tokens(usize::MAX).iter().any(|t| t.id == served.id));
                        }
                        None => {
                            prop_assert!(lowest.is_none());
                            prop_assert_eq!(queue.state(), before);
                        }
                    }
                }
                Action::ServeAt(pos) => {
                    let pending: Vec<String> = queue.pending_tokens().iter().map(|t| t.id.clone()).collect();
                    if pending.is_empty() {
                        continue;
                    }
                    let id = &pending[pos % pending.len()];
                    let served = queue.serve_specific(id, &reception()).unwrap();
                    prop_assert_eq!(queue.state().last_served_token, served.number);
                }
            }

            prop_assert_eq!(queue.state().current_token_number, issued);

            let pending: Vec<u32> = queue.pending_tokens().iter().map(|t| t.number).collect();
            prop_assert!(pending.windows(2).all(|w| w[0] < w[1]));
            let completed: Vec<u32> = queue.completed_tokens(usize::MAX).iter().map(|t| t.number).collect();
            prop_assert!(completed.windows(2).all(|w| w[0] > w[1]));
            prop_assert_eq!(pending.len() + completed.len(), issued as usize);
        }

        // Memory matches the store
        let in_memory = queue.tokens().to_vec();
        let state = queue.state();
        queue.refresh().unwrap();
        prop_assert_eq!(queue.state(), state);
        let mut reloaded = queue.tokens().to_vec();
        let mut expected = in_memory;
        reloaded.sort_by_key(|t| t.number);
        expected.sort_by_key(|t| t.number);
        prop_assert_eq!(reloaded, expected);
    }
}
