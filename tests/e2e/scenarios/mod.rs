mod cache_behaviour;
mod end_to_end;
mod invalidation_cascade;
