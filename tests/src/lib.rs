//! End-to-end scenarios driving the scanner through a scripted probe.

#[cfg(test)]
mod mock;
#[cfg(test)]
mod scan;
