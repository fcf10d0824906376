mod helpers;
mod tests_corruption;
mod tests_meta;
mod tests_roundtrip;
