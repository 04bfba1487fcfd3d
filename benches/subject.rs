use std::{cell::Cell, rc::Rc};

use bencher::{benchmark_group, benchmark_main, black_box, Bencher};
use rxcore::prelude::*;

fn subject_fan_out(b: &mut Bencher) {
  b.iter(|| {
    let subject = Subject::<usize, ()>::new();
    let sum = Rc::new(Cell::new(0));
    for _ in 0..16 {
      let sum = sum.clone();
      subject.subscribe(move |v| sum.set(sum.get() + v));
    }
    for v in 0..100 {
      subject.next(v);
    }
    subject.complete();
    black_box(sum.get())
  });
}

fn from_iter_pipeline(b: &mut Bencher) {
  b.iter(|| {
    let sum = Rc::new(Cell::new(0));
    let c_sum = sum.clone();
    observable::from_iter::<_, ()>(0..1000usize)
      .map(|v| v * 3)
      .filter(|v| v % 2 == 0)
      .take(400)
      .subscribe(move |v| c_sum.set(c_sum.get() + v));
    black_box(sum.get())
  });
}

fn merge_map_synchronous_inners(b: &mut Bencher) {
  b.iter(|| {
    let count = Rc::new(Cell::new(0));
    let c_count = count.clone();
    observable::from_iter::<_, ()>(0..200usize)
      .merge_map(|v| observable::from_iter(v..v + 5), 4)
      .subscribe(move |_| c_count.set(c_count.get() + 1));
    black_box(count.get())
  });
}

benchmark_group!(benches, subject_fan_out, from_iter_pipeline, merge_map_synchronous_inners);
benchmark_main!(benches);
