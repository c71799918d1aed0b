/*
MIT License

Copyright (c) 2021 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
use std::fs::File;
use std::io::Read;
use ustar_stream::{ArchiveDecoder, ArchiveEncoder, DirEntry, EntryDescriptor, EntryOptions, FileEntry};

/// Packs the files given on the command line into an in-memory archive and
/// lists it again. Without arguments, a few built-in entries are packed.
fn main() {
    // log: not mandatory
    std::env::set_var("RUST_LOG", "trace");
    env_logger::init();

    let paths = std::env::args().skip(1).collect::<Vec<_>>();
    let entries: Vec<EntryDescriptor> = if paths.is_empty() {
        let readme = b"streamed through the encoder\n";
        vec![
            DirEntry::new("demo").into(),
            FileEntry::from_reader("demo/readme.txt", readme.len() as u64, &readme[..])
                .with_options(EntryOptions::default().with_mode("644"))
                .into(),
            FileEntry::from_bytes(
                "demo/gnu_tar_default.tar",
                &include_bytes!("../tests/gnu_tar_default.tar")[..],
            )
            .into(),
        ]
    } else {
        paths
            .iter()
            .map(|path| {
                let file = File::open(path).expect("should open file");
                let size = file.metadata().expect("should read metadata").len();
                EntryDescriptor::from(
                    FileEntry::from_reader(path.as_str(), size, file)
                        .with_options(EntryOptions::default().with_mode("644")),
                )
            })
            .collect()
    };

    let mut encoder = ArchiveEncoder::new(entries);
    let mut archive = Vec::new();
    encoder.read_to_end(&mut archive).expect("should encode archive");
    println!("archive has {} bytes", archive.len());

    let mut decoder = ArchiveDecoder::from_reader(archive.as_slice());
    while let Some(entry) = decoder.next_entry() {
        let mut entry = entry.expect("should decode entry");
        println!("{:#?}", entry.header());
        if let Some(mut body) = entry.body() {
            let content = body.read_to_vec().expect("should read body");
            println!("{}: {} bytes", entry.pathname().unwrap_or("<non-UTF-8>"), content.len());
        }
    }
}
