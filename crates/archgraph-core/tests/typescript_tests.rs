use std::fs;
use std::path::Path;

use archgraph_core::config::DiscoveryConfig;
use archgraph_core::graph::ParameterLink;
use archgraph_core::parser::{build_graph, TypeScriptParser};
use archgraph_core::DependencyGraph;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn nest_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "package.json", "{}");

    write(
        root,
        "src/main.ts",
        r#"import { NestFactory } from '@nestjs/core';
import { AppModule } from './app.module';

async function bootstrap() {
  const app = await NestFactory.create(AppModule);
  await app.listen(3000);
}
bootstrap();
"#,
    );

    write(
        root,
        "src/app.module.ts",
        r#"import { Module } from '@nestjs/common';
import { UsersController } from './users/users.controller';
import { UsersService } from './users/users.service';

@Module({ controllers: [UsersController], providers: [UsersService] })
export class AppModule {}
"#,
    );

    write(
        root,
        "src/users/users.controller.ts",
        r#"import { Body, Controller, Get, Param, Post } from '@nestjs/common';
import { UsersService } from './users.service';
import { CreateUserDto } from './dto';

@Controller('users')
export class UsersController {
  constructor(private readonly usersService: UsersService) {}

  @Get(':id')
  findOne(@Param('id') id: string) {
    const user = this.usersService.find(id);
    if (!user) {
      throw new NotFoundException();
    }
    return user;
  }

  @Post()
  create(@Body() body: CreateUserDto) {
    return this.usersService.create(body);
  }
}
"#,
    );

    write(
        root,
        "src/users/users.service.ts",
        r#"import { Injectable } from '@nestjs/common';
import { CreateUserDto } from './dto';

@Injectable()
export class UsersService {
  find(id: string) {
    return null;
  }

  create(dto: CreateUserDto) {
    return dto;
  }
}
"#,
    );

    write(
        root,
        "src/users/dto/index.ts",
        "export class CreateUserDto {\n  name: string;\n}\n",
    );

    write(
        root,
        "src/users/users.controller.spec.ts",
        "import { UsersController } from './users.controller';\n",
    );

    temp
}

fn build_both(root: &Path) -> (DependencyGraph, DependencyGraph) {
    let heuristic = build_graph(&TypeScriptParser::heuristic(DiscoveryConfig::default()), root).unwrap();
    let syntax_tree = build_graph(
        &TypeScriptParser::syntax_tree(DiscoveryConfig::default()).unwrap(),
        root,
    )
    .unwrap();
    (heuristic, syntax_tree)
}

#[test]
fn test_nest_project_structure() {
    let temp = nest_project();
    let (graph, _) = build_both(temp.path());

    let mut ids: Vec<&str> = graph.node_ids().collect();
    ids.sort();
    assert_eq!(
        ids,
        vec![
            "src/app.module",
            "src/main",
            "src/users/dto/index",
            "src/users/users.controller",
            "src/users/users.service",
        ]
    );

    // `./dto` resolves through the index fallback
    let mut deps = graph.dependencies_of("src/users/users.controller");
    deps.sort();
    assert_eq!(deps, vec!["src/users/dto/index", "src/users/users.service"]);

    assert_eq!(graph.dependencies_of("src/main"), vec!["src/app.module"]);

    assert!(graph.is_entry_point("src/main"));
    assert!(graph.is_entry_point("src/users/users.controller"));
    assert!(!graph.is_entry_point("src/users/users.service"));
}

#[test]
fn test_strategy_parity_on_nest_project() {
    let temp = nest_project();
    let (heuristic, syntax_tree) = build_both(temp.path());

    let mut heuristic_ids: Vec<&str> = heuristic.node_ids().collect();
    let mut tree_ids: Vec<&str> = syntax_tree.node_ids().collect();
    heuristic_ids.sort();
    tree_ids.sort();
    assert_eq!(heuristic_ids, tree_ids);

    for id in heuristic_ids {
        let mut a = heuristic.dependencies_of(id);
        let mut b = syntax_tree.dependencies_of(id);
        a.sort();
        b.sort();
        assert_eq!(a, b, "dependencies of {}", id);
        assert_eq!(heuristic.is_entry_point(id), syntax_tree.is_entry_point(id), "{}", id);
        assert_eq!(heuristic.node_info(id), syntax_tree.node_info(id), "{}", id);
    }

    let controller = "src/users/users.controller";
    let mut a = heuristic.method_info(controller).to_vec();
    let mut b = syntax_tree.method_info(controller).to_vec();
    a.sort_by(|x, y| x.method_name.cmp(&y.method_name));
    b.sort_by(|x, y| x.method_name.cmp(&y.method_name));
    assert_eq!(a, b);

    assert_eq!(
        heuristic.method_parameters_of(controller),
        syntax_tree.method_parameters_of(controller)
    );
}

#[test]
fn test_nest_controller_details() {
    let temp = nest_project();
    let (_, graph) = build_both(temp.path());
    let controller = "src/users/users.controller";

    assert_eq!(
        graph
            .node_info(controller)
            .and_then(|i| i.class_type.as_deref()),
        Some("controller")
    );
    assert_eq!(
        graph
            .node_info("src/users/users.service")
            .and_then(|i| i.class_type.as_deref()),
        Some("service")
    );
    assert_eq!(
        graph
            .node_info("src/app.module")
            .and_then(|i| i.class_type.as_deref()),
        Some("config")
    );

    let methods = graph.method_info(controller);
    let find_one = methods.iter().find(|m| m.method_name == "findOne").unwrap();
    assert_eq!(find_one.http_method.as_deref(), Some("GET"));
    assert_eq!(find_one.http_path.as_deref(), Some("/users/:id"));
    assert_eq!(find_one.line_number, Some(10));
    assert_eq!(find_one.exceptions, Some(vec!["NotFoundException".to_string()]));

    let create = methods.iter().find(|m| m.method_name == "create").unwrap();
    assert_eq!(create.http_method.as_deref(), Some("POST"));
    assert_eq!(create.http_path.as_deref(), Some("/users"));

    assert_eq!(
        graph.method_parameters(controller, "constructor"),
        &[ParameterLink {
            position: 0,
            target: "src/users/users.service".to_string(),
        }]
    );
    assert_eq!(
        graph.method_parameters(controller, "create"),
        &[ParameterLink {
            position: 0,
            target: "src/users/dto/index".to_string(),
        }]
    );
}

#[test]
fn test_express_routes_and_aliases() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(
        root,
        "src/server.js",
        r#"const express = require('express');
const orders = require('./routes/orders');

const app = express();
app.use('/orders', orders);
app.listen(8080);
"#,
    );
    write(
        root,
        "src/routes/orders.js",
        r#"const { Router } = require('express');
const { listOrders } = require('@/handlers/orders');

const router = Router();

router.get('/', listOrders);
router.post('/', async (req, res) => {
  res.status(201).end();
});

module.exports = router;
"#,
    );
    write(
        root,
        "src/handlers/orders.js",
        "async function listOrders(req, res) {\n  res.json([]);\n}\nmodule.exports = { listOrders };\n",
    );

    let (heuristic, syntax_tree) = build_both(root);
    for graph in [heuristic, syntax_tree] {
        assert_eq!(graph.dependencies_of("src/server"), vec!["src/routes/orders"]);
        assert_eq!(
            graph.dependencies_of("src/routes/orders"),
            vec!["src/handlers/orders"]
        );

        assert!(graph.is_entry_point("src/server"));
        assert!(graph.is_entry_point("src/routes/orders"));
        assert!(!graph.is_entry_point("src/handlers/orders"));

        let methods = graph.method_info("src/routes/orders");
        let endpoints: Vec<(Option<&str>, Option<&str>)> = methods
            .iter()
            .map(|m| (m.http_method.as_deref(), m.http_path.as_deref()))
            .collect();
        assert!(endpoints.contains(&(Some("GET"), Some("/"))));
        assert!(endpoints.contains(&(Some("POST"), Some("/"))));
    }
}

#[test]
fn test_next_route_handlers() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "tsconfig.json", "{}");
    write(
        root,
        "src/app/api/orders/[id]/route.ts",
        r#"import { NextResponse } from 'next/server';

export async function GET(request: Request) {
  return NextResponse.json({});
}

export async function DELETE(request: Request) {
  return new NextResponse(null, { status: 204 });
}
"#,
    );

    let (heuristic, syntax_tree) = build_both(root);
    for graph in [heuristic, syntax_tree] {
        let id = "src/app/api/orders/[id]/route";
        assert!(graph.is_entry_point(id));
        let methods = graph.method_info(id);
        assert_eq!(methods.len(), 2);
        assert!(methods
            .iter()
            .all(|m| m.http_path.as_deref() == Some("/api/orders/[id]")));
        assert_eq!(methods[1].http_method.as_deref(), Some("DELETE"));
    }
}

#[test]
fn test_malformed_file_keeps_node() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "src/broken.service.ts", "export class {{{ ((( import");
    write(root, "src/index.ts", "import { x } from './broken.service';\n");

    let (_, graph) = build_both(root);
    assert!(graph.contains("src/broken.service"));
    assert!(graph.method_info("src/broken.service").is_empty());
    assert_eq!(
        graph
            .node_info("src/broken.service")
            .and_then(|i| i.class_type.as_deref()),
        Some("service")
    );
    assert_eq!(graph.dependencies_of("src/index"), vec!["src/broken.service"]);
}
