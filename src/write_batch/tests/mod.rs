mod tests_extended_tags;
