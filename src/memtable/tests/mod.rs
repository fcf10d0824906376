mod tests_mvcc;
mod tests_tombstone;
