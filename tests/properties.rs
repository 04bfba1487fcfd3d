//! Property tests for the core contracts.

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use proptest::prelude::*;
use rxcore::{
  prelude::*,
  testing::{parse_marbles, TestMessage},
};

proptest! {
  #[test]
  fn unsubscribe_runs_each_teardown_once(teardowns in 0usize..20, calls in 1usize..5) {
    let runs = Rc::new(Cell::new(0));
    let subscription = Subscription::new();
    for _ in 0..teardowns {
      let runs = runs.clone();
      subscription.add(move || runs.set(runs.get() + 1));
    }

    for _ in 0..calls {
      prop_assert!(subscription.unsubscribe().is_ok());
    }

    prop_assert_eq!(runs.get(), teardowns);
    prop_assert_eq!(subscription.teardown_size(), 0);
  }

  #[test]
  fn virtual_time_orders_by_delay_then_insertion(delays in prop::collection::vec(0u64..50, 0..30)) {
    let scheduler = VirtualTimeScheduler::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for (idx, delay) in delays.iter().enumerate() {
      let order = order.clone();
      scheduler.schedule_task(
        Duration::from_millis(*delay),
        Box::new(move || order.borrow_mut().push(idx)),
      );
    }
    scheduler.flush();

    let mut expected: Vec<usize> = (0..delays.len()).collect();
    expected.sort_by_key(|idx| delays[*idx]);
    prop_assert_eq!(&*order.borrow(), &expected);
  }

  #[test]
  fn marble_frames_follow_character_positions(diagram in "[-a]{0,40}") {
    let messages = parse_marbles::<_, ()>(&diagram, &[('a', 'a')], None, false).unwrap().messages;
    let expected: Vec<_> = diagram
      .char_indices()
      .filter(|(_, ch)| *ch == 'a')
      .map(|(pos, _)| TestMessage::next(pos as u64, 'a'))
      .collect();
    prop_assert_eq!(messages, expected);
  }

  #[test]
  fn take_never_exceeds_its_count(len in 0usize..50, count in 0usize..60) {
    let result = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(Cell::new(false));
    let (result_clone, completed_clone) = (result.clone(), completed.clone());
    observable::from_iter::<_, ()>(0..len)
      .take(count)
      .subscribe_complete(
        move |v| result_clone.borrow_mut().push(v),
        move || completed_clone.set(true),
      );

    let expected: Vec<usize> = (0..len.min(count)).collect();
    prop_assert_eq!(&*result.borrow(), &expected);
    prop_assert!(completed.get());
  }
}
