mod collection_test;
mod query_test;
mod scoping_test;
