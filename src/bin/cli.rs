//! pkread CLI Client
//!
//! Command-line interface for issuing primary-key reads.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use clap::{Parser, Subcommand};
use pkread::protocol::{
    decode_batch_response, read_response, write_request, RequestFrame, ResponseCode, ResponseFrame,
};
use pkread::{Config, LookupRequest};

/// pkread CLI
#[derive(Parser, Debug)]
#[command(name = "pkread-cli")]
#[command(about = "CLI for the pkread primary-key read server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:4406")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read one row by primary key
    Read {
        /// Database name
        #[arg(long)]
        db: String,

        /// Table name
        #[arg(long)]
        table: String,

        /// Primary-key value as column=value (repeat for composite keys)
        #[arg(long = "pk", required = true)]
        pk: Vec<String>,

        /// Column to read (repeat; omit to read every non-key column)
        #[arg(long = "col")]
        columns: Vec<String>,

        /// Operation id echoed back in the response
        #[arg(long)]
        op_id: Option<String>,
    },

    /// Read several rows of one table in a single round trip
    Batch {
        /// Database name
        #[arg(long)]
        db: String,

        /// Table name
        #[arg(long)]
        table: String,

        /// One row's key as column=value[,column=value] (repeat per row)
        #[arg(long = "key", required = true)]
        keys: Vec<String>,

        /// Column to read (repeat; omit to read every non-key column)
        #[arg(long = "col")]
        columns: Vec<String>,
    },

    /// Show the server's transaction counters
    Stat,

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let frame = match args.command {
        Commands::Ping => Ok(RequestFrame::Ping),
        Commands::Stat => Ok(RequestFrame::Stat),
        Commands::Read {
            db,
            table,
            pk,
            columns,
            op_id,
        } => build_request(db, table, pk, columns, op_id)
            .map(|request| RequestFrame::PkRead { request }),
        Commands::Batch {
            db,
            table,
            keys,
            columns,
        } => keys
            .iter()
            .map(|key| {
                let pk = key.split(',').map(str::to_string).collect();
                build_request(db.clone(), table.clone(), pk, columns.clone(), None)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|requests| RequestFrame::Batch { requests }),
    };
    let frame = match frame {
        Ok(frame) => frame,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    if let Err(message) = send(&args.server, &frame) {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

fn build_request(
    db: String,
    table: String,
    pk: Vec<String>,
    columns: Vec<String>,
    op_id: Option<String>,
) -> Result<Vec<u8>, String> {
    let mut request = LookupRequest::new(db, table);
    for pair in pk {
        let (column, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("--pk expects column=value, got {:?}", pair))?;
        request = request.filter(column, value);
    }
    for column in columns {
        request = request.read_column(column);
    }
    if let Some(id) = op_id {
        request = request.with_operation_id(id);
    }

    let config = Config::default();
    request.validate(&config).map_err(|e| e.to_string())?;

    // grow until the encoded request fits
    let mut capacity = 1024;
    loop {
        match request.encode(capacity) {
            Ok(bytes) => return Ok(bytes.to_vec()),
            Err(pkread::PkReadError::BufferOverflow { needed, .. })
                if capacity < config.request_buffer_size =>
            {
                capacity = ((needed + 3) / 4 * 4).min(config.request_buffer_size);
            }
            Err(e) => return Err(e.to_string()),
        }
    }
}

fn send(server: &str, frame: &RequestFrame) -> Result<(), String> {
    let stream =
        TcpStream::connect(server).map_err(|e| format!("Failed to connect to {}: {}", server, e))?;
    let read_stream = stream.try_clone().map_err(|e| e.to_string())?;
    let mut reader = BufReader::new(read_stream);
    let mut writer = BufWriter::new(stream);

    write_request(&mut writer, frame).map_err(|e| e.to_string())?;
    let response = read_response(&mut reader).map_err(|e| e.to_string())?;

    match frame {
        RequestFrame::Ping if response.code == ResponseCode::Ok => {
            println!("PONG");
            Ok(())
        }
        RequestFrame::Batch { .. } if response.code == ResponseCode::Ok => {
            let responses = decode_batch_response(&response.payload).map_err(|e| e.to_string())?;
            for (n, response) in responses.iter().enumerate() {
                print!("[{}] ", n);
                if let Err(message) = print_response(response) {
                    println!("{}", message);
                }
            }
            Ok(())
        }
        _ => print_response(&response),
    }
}

fn print_response(response: &ResponseFrame) -> Result<(), String> {
    let payload = String::from_utf8_lossy(&response.payload);
    match response.code {
        ResponseCode::Ok => println!("{}", payload),
        ResponseCode::NotFound => println!("(not found)"),
        ResponseCode::ClientError => return Err(format!("client error: {}", payload)),
        ResponseCode::ServerError => return Err(format!("server error: {}", payload)),
    }
    Ok(())
}
