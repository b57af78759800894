//! Worst-status aggregation of several timelines into one.
//!
//! A sweep over every boundary in the inputs: between two consecutive cut
//! points each input is constant, so the aggregate status of that slice is
//! the [`Status::worst_of`] the inputs active there.

use chrono::{DateTime, Utc};

use crate::{
  ids::SubjectId,
  status::Status,
  timeline::{Timeline, TimelineInterval, coalesce},
};

/// Combine `inputs` into a single coalesced timeline for `subject`.
///
/// - A slice where no input has an interval is `UNKNOWN`.
/// - The result ends open only if at least one input is still open.
/// - No inputs yield an empty timeline; callers typically follow with
///   [`Timeline::or_unknown`].
pub fn aggregate<'a, I>(subject: SubjectId, inputs: I) -> Timeline
where
  I: IntoIterator<Item = &'a Timeline>,
{
  let inputs: Vec<&[TimelineInterval]> = inputs
    .into_iter()
    .map(|t| t.intervals.as_slice())
    .filter(|intervals| !intervals.is_empty())
    .collect();

  match inputs.as_slice() {
    [] => return Timeline::empty(subject),
    [single] => {
      return Timeline::new(subject, coalesce(single.to_vec()));
    }
    _ => {}
  }

  let mut cuts: Vec<DateTime<Utc>> = inputs
    .iter()
    .flat_map(|intervals| {
      intervals.iter().flat_map(|i| std::iter::once(i.start_time).chain(i.end_time))
    })
    .collect();
  cuts.sort_unstable();
  cuts.dedup();

  let any_open = inputs
    .iter()
    .any(|intervals| intervals.last().is_some_and(TimelineInterval::is_open));

  // One cursor per input, advanced monotonically as the sweep moves right.
  let mut cursors = vec![0usize; inputs.len()];
  let mut slices = Vec::with_capacity(cuts.len());

  for (idx, &start) in cuts.iter().enumerate() {
    let end = cuts.get(idx + 1).copied();
    if end.is_none() && !any_open {
      break;
    }

    let active = inputs.iter().zip(cursors.iter_mut()).filter_map(
      |(intervals, cursor)| {
        while intervals
          .get(*cursor)
          .is_some_and(|i| i.end_time.is_some_and(|e| e <= start))
        {
          *cursor += 1;
        }
        intervals
          .get(*cursor)
          .filter(|i| i.contains(start))
          .map(|i| i.status)
      },
    );
    let status = Status::worst_of(active).unwrap_or(Status::Unknown);

    slices.push(TimelineInterval { status, start_time: start, end_time: end });
  }

  Timeline::new(subject, coalesce(slices))
}
