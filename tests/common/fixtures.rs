//! Descriptor builders and a small clean-architecture codebase for integration tests.
#![allow(dead_code)]

use archflow::domain::descriptor::{
    ClassDescriptor, ClassKind, CodebaseSnapshot, ConstructorDescriptor, MethodDescriptor,
    PackageRef, ParameterDescriptor, ParsedFile, ProjectDescriptor,
};

pub fn class(namespace: &str, name: &str, file: &str) -> ClassDescriptor {
    ClassDescriptor::new(name, namespace, file)
}

pub fn interface(namespace: &str, name: &str, file: &str) -> ClassDescriptor {
    let mut cls = ClassDescriptor::new(name, namespace, file);
    cls.kind = ClassKind::Interface;
    cls
}

pub fn with_ctor(mut cls: ClassDescriptor, params: &[(&str, &str)]) -> ClassDescriptor {
    cls.constructors.push(ConstructorDescriptor::with_parameters(
        params
            .iter()
            .map(|(name, ty)| ParameterDescriptor::new(*name, *ty))
            .collect(),
    ));
    cls
}

pub fn with_interfaces(mut cls: ClassDescriptor, interfaces: &[&str]) -> ClassDescriptor {
    cls.interfaces.extend(interfaces.iter().map(|i| i.to_string()));
    cls
}

pub fn with_bases(mut cls: ClassDescriptor, bases: &[&str]) -> ClassDescriptor {
    cls.base_types.extend(bases.iter().map(|b| b.to_string()));
    cls
}

pub fn with_attributes(mut cls: ClassDescriptor, attributes: &[&str]) -> ClassDescriptor {
    cls.attributes.extend(attributes.iter().map(|a| a.to_string()));
    cls
}

pub fn with_methods(mut cls: ClassDescriptor, methods: &[&str]) -> ClassDescriptor {
    cls.methods
        .extend(methods.iter().map(|m| MethodDescriptor::named(*m)));
    cls
}

pub fn project(name: &str) -> ProjectDescriptor {
    ProjectDescriptor::new(name, format!("src/{name}/{name}.csproj"))
}

/// Groups classes into one parsed file per declaring path, in first-seen order.
pub fn snapshot(projects: Vec<ProjectDescriptor>, classes: Vec<ClassDescriptor>) -> CodebaseSnapshot {
    let mut files: Vec<ParsedFile> = Vec::new();
    for cls in classes {
        match files.iter_mut().find(|f| f.path == cls.file_path) {
            Some(file) => file.classes.push(cls),
            None => files.push(ParsedFile {
                path: cls.file_path.clone(),
                classes: vec![cls],
                error: None,
            }),
        }
    }
    CodebaseSnapshot {
        root: String::new(),
        solution_name: "Shop".to_string(),
        projects,
        files,
    }
}

/// Web → UseCases → Core ← Infrastructure, plus a test project.
///
/// - `CreateOrderEndpoint` declares `Endpoint<CreateOrderRequest, ...>` and `HttpPost("/api/orders")`
/// - `CreateOrderHandler` handles `CreateOrderCommand` through `IRepository<Order>`
/// - `GetOrderHandler` handles `GetOrderQuery` through `IReadRepository<Order>`
/// - `EfRepository<T>` implements both repository interfaces
/// - `AuditEntry` is referenced by nothing
pub fn shop_classes() -> Vec<ClassDescriptor> {
    let web = "src/Shop.Web";
    let uc = "src/Shop.UseCases";
    let core = "src/Shop.Core";
    let infra = "src/Shop.Infrastructure";
    let tests = "src/Shop.Tests";

    vec![
        with_attributes(
            with_ctor(
                with_bases(
                    class("Shop.Web.Orders", "CreateOrderEndpoint", &format!("{web}/Orders/Create.cs")),
                    &["Endpoint<CreateOrderRequest, CreateOrderResponse>"],
                ),
                &[("mediator", "IMediator")],
            ),
            &["HttpPost(\"/api/orders\")"],
        ),
        class("Shop.Web.Orders", "CreateOrderRequest", &format!("{web}/Orders/Create.Request.cs")),
        with_interfaces(
            class("Shop.UseCases.Orders", "CreateOrderCommand", &format!("{uc}/Orders/CreateOrderCommand.cs")),
            &["IRequest<int>"],
        ),
        with_methods(
            with_interfaces(
                with_ctor(
                    class("Shop.UseCases.Orders", "CreateOrderHandler", &format!("{uc}/Orders/CreateOrderHandler.cs")),
                    &[
                        ("repository", "IRepository<Order>"),
                        ("logger", "ILogger<CreateOrderHandler>"),
                        ("pipeline", "ILoggingBehavior"),
                    ],
                ),
                &["IRequestHandler<CreateOrderCommand, int>"],
            ),
            &["Handle", "PublishOrderCreated"],
        ),
        class("Shop.UseCases.Orders", "CreateOrderValidator", &format!("{uc}/Orders/CreateOrderValidator.cs")),
        class("Shop.UseCases.Orders", "GetOrderQuery", &format!("{uc}/Orders/GetOrderQuery.cs")),
        with_ctor(
            class("Shop.UseCases.Orders", "GetOrderHandler", &format!("{uc}/Orders/GetOrderHandler.cs")),
            &[("repository", "IReadRepository<Order>")],
        ),
        with_interfaces(
            with_bases(
                class("Shop.Core.OrderAggregate", "Order", &format!("{core}/OrderAggregate/Order.cs")),
                &["EntityBase"],
            ),
            &["IAggregateRoot"],
        ),
        with_bases(
            class("Shop.Core.OrderAggregate.Events", "OrderCreatedEvent", &format!("{core}/OrderAggregate/Events/OrderCreatedEvent.cs")),
            &["DomainEventBase"],
        ),
        class("Shop.Core.Auditing", "AuditEntry", &format!("{core}/Auditing/AuditEntry.cs")),
        interface("Shop.Core.Interfaces", "IRepository", &format!("{core}/Interfaces/IRepository.cs")),
        interface("Shop.Core.Interfaces", "IReadRepository", &format!("{core}/Interfaces/IReadRepository.cs")),
        with_interfaces(
            class("Shop.Infrastructure.Data", "EfRepository", &format!("{infra}/Data/EfRepository.cs")),
            &["IRepository<T>", "IReadRepository<T>"],
        ),
        class("Shop.Tests.Orders", "CreateOrderHandlerTests", &format!("{tests}/Orders/CreateOrderHandlerTests.cs")),
    ]
}

pub fn shop_projects() -> Vec<ProjectDescriptor> {
    let mut tests = project("Shop.Tests");
    tests.packages.push(PackageRef::new("xunit"));
    vec![
        project("Shop.Web"),
        project("Shop.UseCases"),
        project("Shop.Core"),
        project("Shop.Infrastructure"),
        tests,
    ]
}

pub fn shop_snapshot() -> CodebaseSnapshot {
    snapshot(shop_projects(), shop_classes())
}
