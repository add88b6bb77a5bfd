macro_rules! trace {
    ($($tt:tt)*) => {
        #[cfg(feature = "tracing")] {
            tracing::trace!(target: "chained_hashmap", $($tt)*)
        }
    }
}

pub(crate) use trace;
