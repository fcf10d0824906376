mod tests_mask;
