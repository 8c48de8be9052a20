//! The registry maps service names to the providers which answer for them. It is
//! populated once from the user configuration, and only providers which are
//! enabled are inserted into it.
//!
//! Service names are the identity of a provider everywhere else in xavail: they
//! select a provider on the command line and they tag every cached model. For that
//! reason a name may only be registered once. Registering a second provider under
//! an existing name is a configuration error rather than a silent override.
//!
//! Providers are kept in registration order, which is also the order in which
//! their queries are dispatched during a refresh.

pub(crate) mod populate;
pub(crate) mod registry;
