// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Wires a small application together with a [`Registry`].
//!
//! The configuration is a mapped singleton, the repository and the service are
//! resolved implicitly, and a request-scoped tenant is supplied as an extra
//! parameter without touching the application registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wireup::{Describe, Instance, InvocationError, Lifecycle, Marker, Registry, TypeInfo, TypeShape, Visibility};

static CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Config {
    database_url: String,
}

impl Describe for Config {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Self>(module_path!(), || {
            TypeShape::builder::<Self>()
                .default_with(|| Self {
                    database_url: "postgres://localhost/orders".to_owned(),
                })
                .build()
        })
    }
}

#[derive(Debug)]
struct Repository {
    connection: usize,
    config: Arc<Config>,
}

impl Describe for Repository {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Self>(module_path!(), || {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Config>()], |args| {
                    Ok(Self {
                        connection: CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1,
                        config: args.take()?,
                    })
                })
                .build()
        })
    }
}

#[derive(Debug, Default)]
struct Clock;

impl Describe for Clock {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Self>(module_path!(), || TypeShape::builder::<Self>().default_constructible().build())
    }
}

#[derive(Debug)]
struct Tenant(&'static str);

impl Describe for Tenant {
    fn type_info() -> TypeInfo {
        TypeInfo::opaque::<Self>()
    }
}

#[derive(Debug)]
struct OrderService {
    repository: Arc<Repository>,
    clock: Option<Arc<Clock>>,
    tenant: Option<Arc<Tenant>>,
}

impl Describe for OrderService {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Self>(module_path!(), || {
            TypeShape::builder::<Self>()
                .constructor([TypeInfo::of::<Repository>()], |args| {
                    Ok(Self {
                        repository: args.take()?,
                        clock: None,
                        tenant: None,
                    })
                })
                .field("clock", Visibility::Private, Marker::Inject, |service: &mut Self, clock| service.clock = clock)
                .setter("set_tenant", Visibility::Public, Marker::Inject, |service: &mut Self, tenant| {
                    service.tenant = tenant;
                })
                .method("place_order", Visibility::Public, Marker::None, [TypeInfo::of::<Tenant>()], |service: &mut Self, args| {
                    let tenant: Arc<Tenant> = args.take()?;
                    if service.clock.is_none() {
                        return Err(InvocationError::new("no clock available"));
                    }
                    println!(
                        "placing an order for {} through connection #{} to {}",
                        tenant.0, service.repository.connection, service.repository.config.database_url
                    );
                    Ok(())
                })
                .build()
        })
    }
}

fn main() {
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).init();

    let registry = Registry::new(module_path!());
    registry.add_mapping::<Config>(Lifecycle::Singleton);

    let first = registry.get::<OrderService>().expect("the service is resolvable");
    let second = registry.get::<OrderService>().expect("the service is resolvable");
    println!(
        "two services, connections #{} and #{}, sharing one config: {}",
        first.repository.connection,
        second.repository.connection,
        Arc::ptr_eq(&first.repository.config, &second.repository.config)
    );
    println!("clock injected: {}, tenant injected: {}", first.clock.is_some(), first.tenant.is_some());

    let scoped = registry
        .get_with::<OrderService, _>([Instance::new(Tenant("contoso"))])
        .expect("the service is resolvable");
    println!("scoped tenant: {:?}", scoped.tenant.as_ref().map(|tenant| tenant.0));
    println!("application registry knows the tenant: {}", registry.has_mapping::<Tenant>());

    let mut service = Arc::into_inner(scoped).expect("no other handle to the scoped service");
    if let Err(error) = registry.invoke_named(&mut service, "place_order") {
        println!("as expected, ordering fails outside the request scope: {error}");
    }

    registry.add_instance(Tenant("fabrikam"));
    match registry.invoke_named(&mut service, "place_order") {
        Ok(_) => println!("order placed"),
        Err(error) => println!("order failed: {error}"),
    }
}
