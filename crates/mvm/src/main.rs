// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the host driver.
//
// `mvm <source-file>` translates and runs a program,
// `mvm <source-file> --dump` prints the translated bytecode instead.
//
// exit codes:
// 0 - success
// 1 - usage error, unreadable file
// 2 - compile error
// 3 - runtime error

use std::{env, fs::File, process::exit};

use memmap2::Mmap;

use mathvm_bytecode::format_bytecode;
use mathvm_runtime::execute;
use mathvm_translator::translate;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let (source_path, dump) = match args.as_slice() {
        [_, path] => (path, false),
        [_, path, flag] if flag == "--dump" => (path, true),
        _ => {
            eprintln!("usage: mvm <source-file> [--dump]");
            exit(1);
        }
    };

    let source = match read_source(source_path) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("{}: {}", source_path, message);
            exit(1);
        }
    };

    let program = match translate(&source) {
        Ok(program) => program,
        Err(e) => {
            let (line, column) = line_and_column(&source, e.position);
            eprintln!("{}:{}:{}: error: {}", source_path, line, column, e.message);
            exit(2);
        }
    };

    if dump {
        for function in program.functions() {
            println!(
                "function {} '{}' (params: {}, locals: {}, scope: {})",
                function.id,
                function.name,
                function.params.len(),
                function.locals_count,
                function.scope_id
            );
            println!("{}", format_bytecode(function.code.as_bytes()));
            println!();
        }
        return;
    }

    let mut stdout = std::io::stdout();
    if let Err(e) = execute(&program, &[], &mut stdout) {
        eprintln!("{}", e);
        exit(3);
    }
}

fn read_source(path: &str) -> Result<String, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let mapped = unsafe { Mmap::map(&file) }.map_err(|e| e.to_string())?;
    String::from_utf8(mapped.to_vec()).map_err(|_| "the source is not valid UTF-8".to_owned())
}

/// 1-based line and column of a byte offset
fn line_and_column(source: &str, offset: u32) -> (usize, usize) {
    let offset = (offset as usize).min(source.len());
    let before = &source[..offset];
    let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = before
        .rfind('\n')
        .map(|start| offset - start)
        .unwrap_or(offset + 1);
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::line_and_column;

    #[test]
    fn test_line_and_column() {
        let source = "int i;\ni = x;\n";
        assert_eq!(line_and_column(source, 0), (1, 1));
        assert_eq!(line_and_column(source, 4), (1, 5));
        assert_eq!(line_and_column(source, 7), (2, 1));
        assert_eq!(line_and_column(source, 11), (2, 5));
    }
}
