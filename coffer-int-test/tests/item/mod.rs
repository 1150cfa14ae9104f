mod item_lifecycle_test;
mod item_hook_test;
