mod fixtures;
mod test_collector;
